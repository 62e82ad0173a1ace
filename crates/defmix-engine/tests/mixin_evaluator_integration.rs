//! End-to-end mixin declaration scenarios: direct and indirect-binding
//! variants, alias resolution, shared extras, cross-declaration
//! collisions, and synchronous re-entrancy.

use std::rc::Rc;

use defmix_engine::{
    ErrorKind, Expr, FunctionObject, InstallSite, InvocationContext, JsValue, MixinDeclaration,
    MixinError, MixinEvaluator, MixinVariant, NativeBody, ScopeKind,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn noop_body() -> NativeBody {
    Rc::new(|_, _| Ok(JsValue::Undefined))
}

/// Provider body that composes and returns a fresh callable.
fn composing_body(result_name: &'static str) -> NativeBody {
    Rc::new(move |eval, _call| {
        let id = eval
            .functions
            .register(FunctionObject::native(result_name, noop_body()));
        Ok(JsValue::Function(id))
    })
}

/// Evaluator with one loaded unit; returns the evaluator and the unit's
/// origin key for registering providers against it.
fn fresh_evaluator(kind: ScopeKind) -> (MixinEvaluator, defmix_engine::OriginKey) {
    let mut eval = MixinEvaluator::new(kind);
    let origin = eval.units.load("lib/mixins.js", "export function mixinFunc1() {}");
    (eval, origin)
}

// ---------------------------------------------------------------------------
// Direct variant
// ---------------------------------------------------------------------------

#[test]
fn two_sources_one_origin_share_one_state_target() {
    let (mut eval, origin) = fresh_evaluator(ScopeKind::Function);
    let f1 = eval
        .functions
        .register(FunctionObject::ordinary("mixinFunc1", origin, composing_body("r1")));
    // The second provider observes the first contribution through its view.
    let f2 = eval.functions.register(FunctionObject::ordinary(
        "mixinFunc2",
        origin,
        Rc::new(|eval, call| {
            assert!(call.view.has(&eval.heap, &"mixinFunc1".into()).unwrap());
            let id = eval
                .functions
                .register(FunctionObject::native("r2", Rc::new(|_, _| Ok(JsValue::Undefined))));
            Ok(JsValue::Function(id))
        }),
    ));

    let decl = MixinDeclaration::new(MixinVariant::Direct, Expr::Literal(JsValue::Null))
        .with_source(Expr::Function(f1))
        .with_source(Expr::Function(f2));
    let outcome = eval
        .evaluate_declaration(&decl, &InvocationContext::plain())
        .expect("declaration evaluates");

    assert_eq!(outcome.installed.len(), 2);
    assert_eq!(outcome.installed[0].origin, outcome.installed[1].origin);
    // One mapping record, both contributions on its target.
    assert_eq!(eval.scope.registry.len(), 1);
    let record = eval.scope.registry.get(origin).unwrap();
    assert!(eval.heap.has_own(record.target, &"mixinFunc1".into()).unwrap());
    assert!(eval.heap.has_own(record.target, &"mixinFunc2".into()).unwrap());
}

#[test]
fn alias_and_shared_extras_scenario() {
    let (mut eval, origin) = fresh_evaluator(ScopeKind::Function);
    // Each provider mutates the shared extras object; the second sees the
    // first's write, proving extras are evaluated once and shared.
    let body: NativeBody = Rc::new(|eval, call| {
        let &JsValue::Object(opts) = &call.extras[0] else {
            panic!("extras[0] should be the options object");
        };
        assert_eq!(
            eval.heap.get_value(opts, &"x".into()).unwrap(),
            Some(JsValue::Int(100))
        );
        let seen = eval.heap.get_value(opts, &"calls".into()).unwrap();
        let count = match seen {
            Some(JsValue::Int(n)) => n + 1,
            _ => 1,
        };
        assert!(eval.heap.set_value(opts, "calls".into(), JsValue::Int(count)).unwrap());
        let id = eval
            .functions
            .register(FunctionObject::native("composed", Rc::new(|_, _| Ok(JsValue::Undefined))));
        Ok(JsValue::Function(id))
    });
    let f1 = eval
        .functions
        .register(FunctionObject::ordinary("mixinFunc1", origin, body.clone()));
    let f2 = eval
        .functions
        .register(FunctionObject::ordinary("mixinFunc2", origin, body));

    let opts = eval.heap.alloc();
    eval.heap.set_value(opts, "x".into(), JsValue::Int(100)).unwrap();

    let decl = MixinDeclaration::new(MixinVariant::Direct, Expr::Literal(JsValue::Null))
        .with_source(Expr::Function(f1))
        .with_aliased_source(Expr::Function(f2), "helper")
        .with_extra(Expr::Literal(JsValue::Object(opts)));
    let outcome = eval
        .evaluate_declaration(&decl, &InvocationContext::plain())
        .expect("declaration evaluates");

    assert_eq!(outcome.installed[0].name, "mixinFunc1");
    assert_eq!(outcome.installed[1].name, "helper");
    assert!(eval.scope.get("mixinFunc1").unwrap().is_callable());
    assert!(eval.scope.get("helper").unwrap().is_callable());
    // The target is keyed by the sources' own names; the alias never
    // reaches the state bag.
    let record = eval.scope.registry.get(origin).unwrap();
    let target_keys: Vec<String> = eval
        .heap
        .own_keys(record.target)
        .unwrap()
        .iter()
        .map(|k| k.as_str().to_string())
        .collect();
    assert_eq!(target_keys, ["mixinFunc1", "mixinFunc2"]);
    assert_eq!(outcome.installed[1].key, "mixinFunc2");
    assert_eq!(
        eval.heap.get_value(opts, &"calls".into()).unwrap(),
        Some(JsValue::Int(2))
    );
}

#[test]
fn duplicate_key_across_declarations_rejects_the_second() {
    let (mut eval, origin) = fresh_evaluator(ScopeKind::Function);
    // Two distinct providers that share the lookup name "a".
    let f1 = eval
        .functions
        .register(FunctionObject::ordinary("a", origin, composing_body("r1")));
    let f2 = eval
        .functions
        .register(FunctionObject::ordinary("a", origin, composing_body("r2")));

    let first = MixinDeclaration::new(MixinVariant::Direct, Expr::Literal(JsValue::Null))
        .with_source(Expr::Function(f1));
    eval.evaluate_declaration(&first, &InvocationContext::plain())
        .expect("first declaration evaluates");
    let installed = eval.scope.get("a").cloned().unwrap();

    // Aliasing the second source does not help: the contribution key is
    // still "a", and the collision fires before its provider runs.
    let second = MixinDeclaration::new(MixinVariant::Direct, Expr::Literal(JsValue::Null))
        .with_aliased_source(Expr::Function(f2), "renamed");
    let err = eval
        .evaluate_declaration(&second, &InvocationContext::plain())
        .unwrap_err();

    assert_eq!(
        err,
        MixinError::DuplicateContribution { key: "a".to_string() }
    );
    assert_eq!(err.kind(), ErrorKind::Reference);
    // The first installation is untouched and nothing installed as the
    // alias.
    assert_eq!(eval.scope.get("a").cloned().unwrap(), installed);
    assert!(!eval.scope.has("renamed"));
    let record = eval.scope.registry.get(origin).unwrap();
    assert_eq!(
        eval.heap.get_value(record.target, &"a".into()).unwrap(),
        Some(installed)
    );
}

#[test]
fn same_key_from_distinct_origins_does_not_collide() {
    let mut eval = MixinEvaluator::new(ScopeKind::Function);
    let origin_a = eval.units.load("a.js", "export function util() {}");
    let origin_b = eval.units.load("b.js", "export function util() {}");
    let fa = eval
        .functions
        .register(FunctionObject::ordinary("util", origin_a, composing_body("ra")));
    let fb = eval
        .functions
        .register(FunctionObject::ordinary("util", origin_b, composing_body("rb")));

    let ctx_a = eval.heap.alloc();
    let ctx_b = eval.heap.alloc();
    let decl_a = MixinDeclaration::new(MixinVariant::Direct, Expr::Literal(JsValue::Object(ctx_a)))
        .with_source(Expr::Function(fa))
        .install_on_context(true);
    let decl_b = MixinDeclaration::new(MixinVariant::Direct, Expr::Literal(JsValue::Object(ctx_b)))
        .with_source(Expr::Function(fb))
        .install_on_context(true);

    eval.evaluate_declaration(&decl_a, &InvocationContext::plain())
        .expect("first origin contributes util");
    eval.evaluate_declaration(&decl_b, &InvocationContext::plain())
        .expect("second origin contributes util independently");

    assert_eq!(eval.scope.registry.len(), 2);
    let ra = eval.scope.registry.get(origin_a).unwrap();
    let rb = eval.scope.registry.get(origin_b).unwrap();
    assert_ne!(ra.target, rb.target);
    assert!(eval.heap.has_own(ra.target, &"util".into()).unwrap());
    assert!(eval.heap.has_own(rb.target, &"util".into()).unwrap());
}

// ---------------------------------------------------------------------------
// Indirect-binding variant
// ---------------------------------------------------------------------------

#[test]
fn indirect_variant_without_install_passes_null_context() {
    let (mut eval, origin) = fresh_evaluator(ScopeKind::Function);
    let f1 = eval.functions.register(FunctionObject::ordinary(
        "mixinFunc1",
        origin,
        Rc::new(|eval, call| {
            // No context object is materialized at all.
            assert_eq!(call.context_value(&eval.scope).unwrap(), JsValue::Null);
            let id = eval
                .functions
                .register(FunctionObject::native("r", Rc::new(|_, _| Ok(JsValue::Undefined))));
            Ok(JsValue::Function(id))
        }),
    ));

    let decl = MixinDeclaration::new(
        MixinVariant::IndirectBinding,
        Expr::Binding("ctx".to_string()),
    )
    .with_source(Expr::Function(f1));
    // The context binding does not even need to exist.
    let outcome = eval
        .evaluate_declaration(&decl, &InvocationContext::plain())
        .expect("declaration evaluates");
    assert_eq!(outcome.installed[0].site, InstallSite::LexicalBinding);
}

#[test]
fn indirect_context_alias_reads_the_live_binding() {
    let (mut eval, origin) = fresh_evaluator(ScopeKind::Function);
    let obj = eval.heap.alloc();
    eval.scope
        .create_mutable("ctx", JsValue::Object(obj))
        .unwrap();

    let f1 = eval.functions.register(FunctionObject::ordinary(
        "mixinFunc1",
        origin,
        Rc::new(|eval, call| {
            // The alias dereferences at call time.
            let current = call.context_value(&eval.scope).unwrap();
            assert!(current.is_object());
            let id = eval
                .functions
                .register(FunctionObject::native("r", Rc::new(|_, _| Ok(JsValue::Undefined))));
            Ok(JsValue::Function(id))
        }),
    ));

    let decl = MixinDeclaration::new(
        MixinVariant::IndirectBinding,
        Expr::Binding("ctx".to_string()),
    )
    .with_source(Expr::Function(f1))
    .install_on_context(true);
    eval.evaluate_declaration(&decl, &InvocationContext::plain())
        .expect("declaration evaluates");
    assert!(eval.heap.has_own(obj, &"mixinFunc1".into()).unwrap());
}

#[test]
fn indirect_variant_interleaves_per_source() {
    let (mut eval, origin) = fresh_evaluator(ScopeKind::Function);
    let good = eval
        .functions
        .register(FunctionObject::ordinary("good", origin, composing_body("rg")));
    // Natives carry no origin and are invalid sources.
    let bad = eval
        .functions
        .register(FunctionObject::native("bad", noop_body()));

    let decl = MixinDeclaration::new(MixinVariant::IndirectBinding, Expr::Literal(JsValue::Null))
        .with_source(Expr::Function(good))
        .with_source(Expr::Function(bad));
    let err = eval
        .evaluate_declaration(&decl, &InvocationContext::plain())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Type);
    // Unlike the direct variant, the first source already ran and its
    // binding stays installed.
    assert!(eval.scope.has("good"));
    let record = eval.scope.registry.get(origin).unwrap();
    assert!(eval.heap.has_own(record.target, &"good".into()).unwrap());
}

// ---------------------------------------------------------------------------
// Re-entrancy
// ---------------------------------------------------------------------------

#[test]
fn reentrant_install_of_same_key_makes_the_outer_contribution_the_duplicate() {
    let (mut eval, origin) = fresh_evaluator(ScopeKind::Function);
    // Inner provider shares the outer provider's lookup name "shared".
    let inner_f = eval
        .functions
        .register(FunctionObject::ordinary("shared", origin, composing_body("ri")));
    let inner_decl = MixinDeclaration::new(MixinVariant::Direct, Expr::Literal(JsValue::Null))
        .with_source(Expr::Function(inner_f));

    let outer_f = eval.functions.register(FunctionObject::ordinary(
        "shared",
        origin,
        Rc::new(move |eval, _call| {
            // Re-entrantly evaluate another declaration in the same scope
            // that claims the key the outer declaration is about to take.
            eval.evaluate_declaration(&inner_decl, &InvocationContext::plain())
                .expect("inner declaration evaluates");
            let id = eval
                .functions
                .register(FunctionObject::native("ro", Rc::new(|_, _| Ok(JsValue::Undefined))));
            Ok(JsValue::Function(id))
        }),
    ));

    // The outer binding is aliased so only the contribution keys clash.
    let outer_decl = MixinDeclaration::new(MixinVariant::Direct, Expr::Literal(JsValue::Null))
        .with_aliased_source(Expr::Function(outer_f), "renamed");
    let err = eval
        .evaluate_declaration(&outer_decl, &InvocationContext::plain())
        .unwrap_err();

    // The inner install wins; the outer write is the duplicate.
    assert_eq!(
        err,
        MixinError::DuplicateContribution { key: "shared".to_string() }
    );
    assert!(eval.scope.has("shared"), "inner binding survives");
    assert!(!eval.scope.has("renamed"));
    let record = eval.scope.registry.get(origin).unwrap();
    assert!(eval.heap.has_own(record.target, &"shared".into()).unwrap());
}

// ---------------------------------------------------------------------------
// Class elements
// ---------------------------------------------------------------------------

#[test]
fn class_element_installs_private_fields_on_the_instance() {
    let mut eval = MixinEvaluator::new(ScopeKind::Class);
    let origin = eval.units.load("lib/mixins.js", "");
    let f1 = eval
        .functions
        .register(FunctionObject::ordinary("mixinFunc1", origin, composing_body("r1")));

    let this = eval.heap.alloc();
    let decl = MixinDeclaration::new(MixinVariant::Direct, Expr::Literal(JsValue::Null))
        .with_source(Expr::Function(f1))
        .as_class_element();
    let outcome = eval
        .evaluate_declaration(&decl, &InvocationContext::constructor(this))
        .expect("declaration evaluates under construction");

    assert_eq!(outcome.installed[0].site, InstallSite::PrivateField);
    let id = eval.scope.private_id("mixinFunc1").expect("private name declared");
    assert!(eval.heap.has_private(this, id).unwrap());
    assert!(
        eval.heap
            .get_private(this, id)
            .unwrap()
            .unwrap()
            .is_callable()
    );
    // Nothing leaked onto the public surface.
    assert!(eval.heap.own_keys(this).unwrap().is_empty());
}

#[test]
fn class_element_with_install_flag_targets_the_instance_publicly() {
    let mut eval = MixinEvaluator::new(ScopeKind::Class);
    let origin = eval.units.load("lib/mixins.js", "");
    let f1 = eval
        .functions
        .register(FunctionObject::ordinary("mixinFunc1", origin, composing_body("r1")));

    let this = eval.heap.alloc();
    let decl = MixinDeclaration::new(MixinVariant::Direct, Expr::This)
        .with_source(Expr::Function(f1))
        .install_on_context(true)
        .as_class_element();
    let outcome = eval
        .evaluate_declaration(&decl, &InvocationContext::constructor(this))
        .expect("declaration evaluates under construction");

    assert_eq!(outcome.installed[0].site, InstallSite::ContextProperty);
    assert!(eval.heap.has_own(this, &"mixinFunc1".into()).unwrap());
    assert!(eval.scope.private_id("mixinFunc1").is_none());
}
