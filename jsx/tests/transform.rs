use pretty_assertions::assert_eq;

fn lower(source: &str) -> String {
    jsx::transform(source)
        .unwrap_or_else(|e| panic!("transform failed: {}\n  | {}", e, e.source_excerpt))
        .into_string()
}

fn lower_err(source: &str) -> jsx::TransformError {
    jsx::transform(source).expect_err("expected transform to fail")
}

#[test]
fn element_with_text() {
    assert_eq!(
        lower("() => (<div>Hello</div>)"),
        r#"() => React.createElement("div", null, "Hello")"#
    );
}

#[test]
fn attributes_and_expression_children() {
    assert_eq!(
        lower(r#"() => <div className="a" id={x}>hi {name}!</div>"#),
        r#"() => React.createElement("div", { className: "a", id: x }, "hi ", name, "!")"#
    );
}

#[test]
fn hyphenated_attribute_names_are_quoted() {
    assert_eq!(
        lower(r#"() => <button aria-label="Close" data-id={1} />"#),
        r#"() => React.createElement("button", { "aria-label": "Close", "data-id": 1 })"#
    );
}

#[test]
fn fragments() {
    assert_eq!(
        lower("() => <><b /></>"),
        "() => React.createElement(React.Fragment, null, React.createElement(\"b\", null))"
    );
}

#[test]
fn components_spreads_and_boolean_attributes() {
    assert_eq!(
        lower("() => <Card.Title {...props} disabled />"),
        "() => React.createElement(Card.Title, { ...props, disabled: true })"
    );
}

#[test]
fn capitalized_names_are_references() {
    assert_eq!(
        lower("() => { const Item = () => <li />; return <Item /> }"),
        "() => {\n  const Item = () => React.createElement(\"li\", null);\n  return React.createElement(Item, null);\n}"
    );
}

#[test]
fn multiline_text_whitespace() {
    let source = "() => (
  <ul>
    <li>One</li>
    <li>
      Two
      words
    </li>
  </ul>
)";
    assert_eq!(
        lower(source),
        "() => React.createElement(\"ul\", null, React.createElement(\"li\", null, \"One\"), React.createElement(\"li\", null, \"Two words\"))"
    );
}

#[test]
fn entities_are_decoded() {
    assert_eq!(
        lower("() => <p title=\"a &amp; b\">&copy; 2024 &amp; co</p>"),
        "() => React.createElement(\"p\", { title: \"a & b\" }, \"\u{a9} 2024 & co\")"
    );
}

#[test]
fn type_annotations_are_stripped() {
    assert_eq!(
        lower("(props: { name: string }): JSX.Element => <p>{props.name as string}</p>"),
        r#"(props) => React.createElement("p", null, props.name)"#
    );
    assert_eq!(lower("<T,>(x: T): T => x!"), "(x) => x");
}

#[test]
fn block_body_with_hooks() {
    let source = "() => {
  type Count = number;
  const [n, setN] = React.useState<Count>(0);
  return <span onClick={() => setN(n + 1)}>{n}</span>;
}";
    assert_eq!(
        lower(source),
        "() => {\n  const [n, setN] = React.useState(0);\n  return React.createElement(\"span\", { onClick: () => setN(n + 1) }, n);\n}"
    );
}

#[test]
fn conditional_and_list_rendering() {
    assert_eq!(
        lower("() => <ul>{items.length ? items.map(i => <li key={i}>{i}</li>) : null}</ul>"),
        "() => React.createElement(\"ul\", null, items.length ? items.map((i) => React.createElement(\"li\", { key: i }, i)) : null)"
    );
}

#[test]
fn trailing_semicolons_are_removed() {
    assert_eq!(lower("() => 1;;\n"), "() => 1");
    assert_eq!(lower("  42;  "), "42");
}

#[test]
fn transform_is_deterministic_and_idempotent() {
    let sources = [
        "() => (<div>Hello</div>)",
        "() => { throw new Error('boom') }",
        "42",
        "({ title }: { title: string }) => <h1 className={`t-${title}`}>{title}</h1>",
        "() => { let s = 0; for (let i = 0; i < 3; i++) { s += i } return <b>{s}</b> }",
    ];
    for source in sources {
        let first = lower(source);
        assert_eq!(first, lower(source), "not deterministic: {}", source);
        assert_eq!(lower(&first), first, "not idempotent: {}", source);
    }
}

#[test]
fn unbalanced_tag_is_a_parse_error() {
    let err = lower_err("() => (<div>");
    assert_eq!(err.message, "unterminated JSX contents for <div>");
    assert_eq!((err.line, err.column), (1, 8));
    assert!(err.to_string().starts_with("parse error at 1:8"));
}

#[test]
fn error_position_on_later_line() {
    let err = lower_err("() => {\n  let x = ;\n}");
    assert_eq!(err.message, "unexpected `;`");
    assert_eq!((err.line, err.column), (2, 11));
    assert_eq!(err.source_excerpt, "  let x = ;");
}

#[test]
fn empty_source_is_an_error() {
    let err = lower_err("");
    assert_eq!(err.message, "unexpected end of input");
    assert_eq!((err.line, err.column), (1, 1));
}

#[test]
fn statements_outside_an_expression_are_rejected() {
    assert_eq!(lower_err("1 2").message, "unexpected token after expression");
    assert_eq!(
        lower_err("() => { class X {} }").message,
        "`class` is not supported"
    );
}

#[test]
fn mismatched_closing_tag() {
    assert_eq!(
        lower_err("() => <a><b></a></b>").message,
        "expected corresponding JSX closing tag for <b>"
    );
}

#[test]
fn pathological_nesting_fails_cleanly() {
    let sources = [
        format!("{}1{}", "[".repeat(2000), "]".repeat(2000)),
        format!("() => {}1{}", "(".repeat(5000), ")".repeat(5000)),
        format!("() => {}x{}", "<b>".repeat(1000), "</b>".repeat(1000)),
        format!("() => ({}1{})", "{ a: ".repeat(1000), " }".repeat(1000)),
        format!("() => 'x'{}", " + 'x'".repeat(10_000)),
    ];
    for source in &sources {
        assert_eq!(lower_err(source).message, "source is nested too deeply");
    }
}

#[test]
fn moderate_nesting_transforms_on_any_stack() {
    let parens = format!("() => {}1{}", "(".repeat(80), ")".repeat(80));
    assert_eq!(lower(&parens), "() => 1");

    let markup = lower(&format!("() => {}x{}", "<b>".repeat(100), "</b>".repeat(100)));
    assert_eq!(markup.matches("React.createElement(\"b\"").count(), 100);
    assert_eq!(jsx::transform(&markup).unwrap().as_str(), markup);

    let arrays = format!("{}1{}", "[".repeat(100), "]".repeat(100));
    assert_eq!(lower(&arrays), arrays);
}

#[test]
fn diagnostic_points_at_span() {
    let err = lower_err("() => <div></span>");
    let diagnostic = err.to_diagnostic(0);
    assert_eq!(diagnostic.labels[0].range, err.span);
    assert!(diagnostic.message.contains("closing tag"));
}
