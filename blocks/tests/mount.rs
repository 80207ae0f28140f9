use std::cell::RefCell;
use std::rc::Rc;

use blocks::{
    CustomBlock, DEFAULT_SOURCE, MountOptions, Page, RenderNode, Stage, compile, create_default,
    mount, mount_with,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use uuid::Uuid;

fn block(source: &str) -> CustomBlock {
    CustomBlock::new(Uuid::new_v4(), source)
}

fn html(source: &str) -> String {
    mount(&block(source)).to_html()
}

fn failure(source: &str) -> (Stage, String) {
    match mount(&block(source)) {
        RenderNode::Error(error) => (error.stage, error.message),
        other => panic!("expected an error node, got {:?}", other),
    }
}

// Scenarios

#[test]
fn hello_mounts_to_a_div() {
    let node = mount(&block("() => (<div>Hello</div>)"));
    let div = node.find_element("div").expect("rendered a div");
    assert_eq!(div.children, vec![RenderNode::Text("Hello".to_string())]);
    assert_eq!(node.to_html(), "<div>Hello</div>");
}

#[test]
fn unbalanced_tag_fails_at_transform() {
    let (stage, message) = failure("() => (<div>");
    assert_eq!(stage, Stage::Transform);
    assert!(message.starts_with("parse error"), "message was {message}");
}

#[test]
fn throwing_block_does_not_affect_siblings() {
    let mut page = Page::new("isolation");
    let good = page.insert_custom_block(0).unwrap();
    let bad = page.insert_custom_block(1).unwrap();
    page.set_source(good, "() => <p>fine</p>").unwrap();
    page.set_source(bad, "() => { throw new Error('boom') }").unwrap();

    let nodes = page.render(&MountOptions::default());
    assert_eq!(nodes[0].to_html(), "<p>fine</p>");
    let error = nodes[1].as_error().expect("second block failed");
    assert_eq!(error.stage, Stage::Render);
    assert_eq!(error.message, "Error: boom");

    assert_eq!(
        page.render_html(&MountOptions::default()),
        "<p>fine</p>\n<div class=\"custom-block-error\" role=\"alert\" inert data-stage=\"render\">Error: boom</div>"
    );
}

#[test]
fn non_factory_value_is_empty() {
    assert_eq!(mount(&block("42")), RenderNode::Empty);
    assert_eq!(mount(&block("<div>markup</div>")), RenderNode::Empty);
}

#[test]
fn edits_apply_on_the_next_render() {
    let page = Rc::new(RefCell::new(Page::new("editing")));
    let id = page.borrow_mut().insert_custom_block(0).unwrap();
    let options = MountOptions::default();

    let mut editor = Page::editor(&page, id).unwrap();
    editor.replace_all("() => <b>one</b>");
    assert_eq!(page.borrow().render_html(&options), "<b>one</b>");

    editor.replace_all("() => (<b>");
    assert!(page.borrow().render(&options)[0].is_error());

    editor.replace_all("() => <i>two</i>");
    assert_eq!(page.borrow().render_html(&options), "<i>two</i>");
}

// Properties

#[test]
fn transform_is_idempotent() {
    let source = "(props: { n?: number }) => <ul>{[1, 2].map((i) => <li key={i}>{i * 2}</li>)}</ul>";
    let first = jsx::transform(source).unwrap();
    let second = jsx::transform(source).unwrap();
    assert_eq!(first.as_str(), second.as_str());
}

#[test]
fn default_block_is_valid() {
    let block = create_default();
    let unit = compile(&block.source, &MountOptions::default());
    assert!(unit.failure.is_none());
    assert!(unit.value.expect("default source binds").is_factory());

    let node = mount(&block);
    assert!(!node.is_error());
    assert_eq!(
        node.to_html(),
        "<div class=\"custom-block\"><h2>Custom block</h2><p>Edit the source of this block to build your own component.</p></div>"
    );
    assert_eq!(block.source, DEFAULT_SOURCE);
}

#[rstest]
#[case("() => <p>{document.title}</p>", "document")]
#[case("() => fetch('/api/pages')", "fetch")]
#[case("() => { process.exit(1) }", "process")]
#[case("() => <Widget />", "Widget")]
fn free_identifiers_fail_at_bind(#[case] source: &str, #[case] name: &str) {
    let (stage, message) = failure(source);
    assert_eq!(stage, Stage::Bind);
    assert_eq!(message, format!("ReferenceError: {} is not defined", name));
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("() => (<div>")]
#[case("((((")]
#[case("}{")]
#[case("() => <a></b>")]
#[case("42")]
#[case("'text'")]
#[case("null")]
#[case("() => { while (true) { break } }")]
#[case("() => ({ not: 'renderable' })")]
#[case("() => [() => 1]")]
#[case("() => { const f = () => f(); return f() }")]
#[case("() => React.createElement(42)")]
#[case("() => { throw undefined }")]
#[case("() => { const a = []; a[4294967296] = 1; return <p>{a.length}</p> }")]
#[case("() => { const a = []; a[4294967294] = 1; return <p>{a.length}</p> }")]
#[case("() => { const a = [1]; a.length = 1e9; return <p>{a.length}</p> }")]
#[case("() => <p>{new Array(1e9).length}</p>")]
#[case("() => <p>{Array.from({ length: 4294967295 }).length}</p>")]
#[case("() => { const a = []; a.label = 'x'; return <p>{a.label}</p> }")]
fn mount_is_total(#[case] source: &str) {
    let node = mount(&block(source));
    // Whatever happened, it serializes
    let _ = node.to_html();
}

#[test]
fn deep_nesting_is_a_transform_error() {
    let sources = [
        format!("{}1{}", "(".repeat(5000), ")".repeat(5000)),
        format!("() => {}x{}", "<b>".repeat(1000), "</b>".repeat(1000)),
        format!("() => <p>{{{}1{}}}</p>", "[".repeat(1000), "]".repeat(1000)),
        format!("() => <p>{{1{}}}</p>", " + 1".repeat(10_000)),
    ];
    for source in &sources {
        let (stage, message) = failure(source);
        assert_eq!(stage, Stage::Transform);
        assert!(message.ends_with("source is nested too deeply"), "message was {message}");
    }
}

#[test]
fn moderately_deep_blocks_mount() {
    let parens = format!("() => <p>{{{}1{}}}</p>", "(".repeat(80), ")".repeat(80));
    assert_eq!(html(&parens), "<p>1</p>");

    let markup = format!("() => {}x{}", "<b>".repeat(100), "</b>".repeat(100));
    assert_eq!(
        html(&markup),
        format!("{}x{}", "<b>".repeat(100), "</b>".repeat(100))
    );

    let arrays = format!("() => <p>{{{}1{}}}</p>", "[".repeat(100), "]".repeat(100));
    assert_eq!(html(&arrays), "<p>1</p>");
}

#[test]
fn nesting_near_the_limit_never_aborts() {
    for depth in [110, 120, 125, 130] {
        let arrays = format!("() => <p>{{{}1{}}}</p>", "[".repeat(depth), "]".repeat(depth));
        let node = mount(&block(&arrays));
        assert!(
            node == RenderNode::Element(blocks::ElementNode {
                tag: "p".to_string(),
                attributes: Vec::new(),
                children: vec![RenderNode::Text("1".to_string())],
            }) || node.is_error(),
            "depth {depth} mounted to {node:?}"
        );
    }
}

#[test]
fn configured_call_depth_is_capped() {
    let options = MountOptions {
        max_call_depth: 1_000_000,
        ..MountOptions::default()
    };
    let source = "() => { const f = () => f(); return f() }";
    let node = mount_with(&block(source), &options);
    let error = node.as_error().expect("runaway recursion failed");
    assert_eq!(error.stage, Stage::Render);
    assert_eq!(error.message, "RangeError: Maximum call stack size exceeded");
}

#[test]
fn each_mount_starts_fresh() {
    let source = "(() => { let renders = 0; return () => <span>{++renders}</span> })()";
    let shared = block(source);
    assert_eq!(mount(&shared).to_html(), "<span>1</span>");
    assert_eq!(mount(&shared).to_html(), "<span>1</span>");
}

// Rendering

#[rstest]
#[case("() => <label htmlFor=\"x\" className=\"lbl\">Name</label>", "<label for=\"x\" class=\"lbl\">Name</label>")]
#[case("() => <input disabled value={3} onChange={() => {}} />", "<input disabled value=\"3\">")]
#[case("() => <div style={{ fontSize: 12, color: 'red' }} hidden={false} />", "<div style=\"font-size:12px;color:red\"></div>")]
#[case("() => <p>{'<b>'} &amp; {null}{false}{0}</p>", "<p>&lt;b&gt; &amp; 0</p>")]
#[case("() => <><i>a</i>{['b', 'c']}</>", "<i>a</i>bc")]
#[case("() => <ul>{[1, 2].map((n) => <li key={n}>{n}</li>)}</ul>", "<ul><li>1</li><li>2</li></ul>")]
#[case("() => <a href={'/q?x=\"1\"&y'}>go</a>", "<a href=\"/q?x=&quot;1&quot;&amp;y\">go</a>")]
fn renders_html(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(html(source), expected);
}

#[test]
fn function_components_receive_props() {
    let source = "() => {
  const Card = ({ title, children }: { title: string; children?: any }) => (
    <section>
      <h3>{title}</h3>
      {children}
    </section>
  );
  return <Card title=\"Hi\"><p>body</p></Card>;
}";
    assert_eq!(html(source), "<section><h3>Hi</h3><p>body</p></section>");
}

#[rstest]
#[case("() => ({ a: 1, b: 2 })", "Objects are not valid as a React child (found: object with keys {a, b})")]
#[case("() => <div>{() => 1}</div>", "Functions are not valid as a React child")]
#[case("() => <div>{React.Fragment}</div>", "Symbols are not valid as a React child")]
#[case("() => { const Broken = () => { throw new Error('inner') }; return <Broken /> }", "Error: inner")]
#[case("() => { const a = []; a.length = 1e9; return <p>{a.length}</p> }", "RangeError: Invalid array length")]
#[case("() => <p>{Array.from({ length: 4294967295 }).length}</p>", "RangeError: Invalid array length")]
#[case("() => { const a = []; a[4294967296] = 1; return <p>{a.length}</p> }", "TypeError: Cannot add property 4294967296 to an array")]
fn render_failures(#[case] source: &str, #[case] expected: &str) {
    let (stage, message) = failure(source);
    assert_eq!(stage, Stage::Render);
    assert_eq!(message, expected);
}

#[test]
fn runaway_component_recursion_is_contained() {
    let source = "() => { const Loop = () => <Loop />; return <Loop /> }";
    let (stage, message) = failure(source);
    assert_eq!(stage, Stage::Render);
    assert!(message.contains("nested deeper than"), "message was {message}");
}

#[test]
fn options_control_depth_and_error_class() {
    let options = MountOptions {
        max_call_depth: 3,
        error_class: "broken".to_string(),
    };
    let source = "() => { const f = (n) => n === 0 ? 'done' : f(n - 1); return <p>{f(5)}</p> }";
    let node = mount_with(&block(source), &options);
    assert_eq!(
        node.to_html_with(&options.error_class),
        "<div class=\"broken\" role=\"alert\" inert data-stage=\"render\">RangeError: Maximum call stack size exceeded</div>"
    );
    assert_eq!(mount(&block(source)).to_html(), "<p>done</p>");
}
