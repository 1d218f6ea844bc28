mod common;

use common::{element, search, search_in, setup_java_project};
use std::collections::BTreeSet;
use stratum_api::{ElementFilter, MatchKind, PatternTarget, SearchCategory, SearchScope};

fn name(pattern: &str, filter: Option<ElementFilter>) -> PatternTarget {
    PatternTarget::Name {
        pattern: pattern.into(),
        filter,
    }
}

#[test]
fn given_calc_prefix_with_type_filter_when_search_declarations_then_only_calculator() {
    let fx = setup_java_project(&[
        (
            "com/acme/Calculator.java",
            "package com.acme; public class Calculator { int calculate() { return 0; } }",
        ),
        ("com/acme/Calendar.java", "package com.acme; public class Calendar {}"),
    ]);
    let hits = search(
        fx.project.as_ref(),
        name("Calc*", Some(ElementFilter::Type)),
        SearchCategory::Declarations,
    );
    let names: Vec<_> = hits.iter().map(|m| m.element.id.as_str()).collect();
    assert_eq!(names, vec!["com.acme.Calculator"]);
    assert_eq!(hits[0].kind, MatchKind::Declaration);
}

#[test]
fn given_service_classes_when_search_suffix_then_contains_user_service() {
    let fx = setup_java_project(&[
        ("a/UserService.java", "package a; public class UserService {}"),
        ("a/OrderService.java", "package a; public class OrderService {}"),
        ("a/Services.java", "package a; public class Services {}"),
    ]);
    let hits = search(
        fx.project.as_ref(),
        name("*Service", Some(ElementFilter::Type)),
        SearchCategory::Declarations,
    );
    let names: BTreeSet<_> = hits.iter().map(|m| m.element.name.clone()).collect();
    assert!(names.contains("UserService"));
    assert!(names.contains("OrderService"));
    assert!(!names.contains("Services"));
}

#[test]
fn given_qualified_pattern_when_search_declarations_then_matches_by_package() {
    let fx = setup_java_project(&[
        ("a/Thing.java", "package a; public class Thing {}"),
        ("b/Thing.java", "package b; public class Thing {}"),
    ]);
    let hits = search(
        fx.project.as_ref(),
        name("b.Thing", None),
        SearchCategory::Declarations,
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].element.id, "b.Thing");
}

#[test]
fn given_field_written_in_three_methods_when_write_accesses_then_three_matches() {
    let fx = setup_java_project(&[(
        "p/Account.java",
        r#"package p;
public class Account {
    private long balance;
    public Account() { balance = 0; }
    void deposit(long amount) { this.balance = balance + amount; }
    void reset() { balance = 0; }
    long read() { return balance; }
}
"#,
    )]);
    let project = fx.project.as_ref();
    let writes = search(
        project,
        element(project, "p.Account#balance"),
        SearchCategory::WriteAccesses,
    );
    let owners: Vec<_> = writes.iter().map(|m| m.element.id.as_str()).collect();
    assert_eq!(
        owners,
        vec!["p.Account#Account()", "p.Account#deposit(long)", "p.Account#reset()"]
    );
    assert!(writes.iter().all(|m| m.kind == MatchKind::Write && m.accurate));

    let reads = search(
        project,
        element(project, "p.Account#balance"),
        SearchCategory::ReadAccesses,
    );
    let readers: Vec<_> = reads.iter().map(|m| m.element.name.as_str()).collect();
    assert_eq!(readers, vec!["deposit", "read"]);
}

#[test]
fn given_compound_assignment_when_searching_accesses_then_counts_as_read_and_write() {
    let fx = setup_java_project(&[(
        "p/Counter.java",
        "package p; class Counter { int hits; void bump() { hits++; } void add(int n) { hits += n; } }",
    )]);
    let project = fx.project.as_ref();
    let target = || element(project, "p.Counter#hits");
    assert_eq!(search(project, target(), SearchCategory::WriteAccesses).len(), 2);
    assert_eq!(search(project, target(), SearchCategory::ReadAccesses).len(), 2);
    assert!(
        search(project, target(), SearchCategory::References)
            .iter()
            .all(|m| m.kind == MatchKind::ReadWrite)
    );
}

#[test]
fn given_type_used_in_many_slots_when_fine_grained_search_then_each_slot_matches_once() {
    let fx = setup_java_project(&[
        ("p/Widget.java", "package p; public class Widget { static Widget create() { return null; } }"),
        ("p/Marker.java", "package p; public @interface Marker {}"),
        ("p/Broken.java", "package p; public class Broken extends Exception {}"),
        (
            "p/Use.java",
            r#"package p;
import java.util.List;
import java.util.function.Supplier;
@Marker
class Use {
    void run(Object o) throws Broken {
        Widget w = new Widget();
        Widget c = (Widget) o;
        boolean b = o instanceof Widget;
        List<Widget> list = null;
        Supplier<Widget> s = Widget::create;
        try { run(o); } catch (Broken e) { }
    }
}
"#,
        ),
    ]);
    let project = fx.project.as_ref();
    let widget = || element(project, "p.Widget");
    let count = |target, category| search(project, target, category).len();

    assert_eq!(count(widget(), SearchCategory::ClassInstanceCreationTypeReference), 1);
    assert_eq!(count(widget(), SearchCategory::CastTypeReference), 1);
    assert_eq!(count(widget(), SearchCategory::InstanceofTypeReference), 1);
    // `List<Widget>` and `Supplier<Widget>`
    assert_eq!(count(widget(), SearchCategory::TypeArgumentTypeReference), 2);
    assert_eq!(count(element(project, "p.Marker"), SearchCategory::AnnotationTypeReference), 1);
    assert_eq!(count(element(project, "p.Broken"), SearchCategory::ThrowsClauseTypeReference), 1);
    assert_eq!(count(element(project, "p.Broken"), SearchCategory::CatchTypeReference), 1);
    assert_eq!(
        count(element(project, "p.Widget#create()"), SearchCategory::MethodReferenceExpression),
        1
    );
}

#[test]
fn given_interface_when_search_implementors_then_implementing_types_reported() {
    let fx = setup_java_project(&[
        ("p/Shape.java", "package p; public interface Shape {}"),
        ("p/Circle.java", "package p; public class Circle implements Shape {}"),
        ("p/Square.java", "package p; public class Square implements Shape, Comparable<Square> {}"),
        ("p/Blob.java", "package p; public class Blob { Shape inner; }"),
    ]);
    let project = fx.project.as_ref();
    let hits = search(project, element(project, "p.Shape"), SearchCategory::Implementors);
    let owners: BTreeSet<_> = hits.iter().map(|m| m.element.id.clone()).collect();
    assert_eq!(
        owners,
        BTreeSet::from(["p.Circle".to_string(), "p.Square".to_string()])
    );
    assert!(hits.iter().all(|m| m.kind == MatchKind::Implementation));
}

#[test]
fn given_same_method_name_on_two_owners_when_find_references_then_only_target_owner_hits() {
    let fx = setup_java_project(&[
        ("A.java", "public class A { void target() {} }"),
        ("B.java", "public class B { void target() {} }"),
        ("Use.java", "public class Use { void run(A a, B b) { a.target(); b.target(); } }"),
    ]);
    let project = fx.project.as_ref();
    let hits = search(project, element(project, "A#target()"), SearchCategory::References);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].element.id, "Use#run(A,B)");
}

#[test]
fn given_type_scope_when_searching_references_then_only_enclosed_matches() {
    let fx = setup_java_project(&[
        ("p/Target.java", "package p; public class Target {}"),
        ("p/One.java", "package p; class One { Target t; }"),
        ("p/Two.java", "package p; class Two { Target t; }"),
    ]);
    let project = fx.project.as_ref();
    let scope = SearchScope::Types(BTreeSet::from(["p.Two".to_string()]));
    let hits = search_in(
        project,
        element(project, "p.Target"),
        SearchCategory::References,
        &scope,
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].element.id, "p.Two#t");
}

#[test]
fn given_inapplicable_category_when_create_pattern_then_rejected() {
    let fx = setup_java_project(&[("p/A.java", "package p; class A { void f() {} }")]);
    let project = fx.project.as_ref();
    let method = project.find_element("p.A#f()").unwrap();
    assert!(
        project
            .create_pattern(PatternTarget::Element(method), SearchCategory::CastTypeReference)
            .is_none()
    );
    assert!(
        project
            .create_pattern(name("", None), SearchCategory::Declarations)
            .is_none()
    );
}
