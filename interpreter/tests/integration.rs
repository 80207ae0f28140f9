use interpreter::{BindError, BindOptions, ComponentValue, RuntimeValue};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn bind(source: &str) -> Result<ComponentValue, BindError> {
    let lowered = jsx::transform(source)
        .unwrap_or_else(|e| panic!("transform failed: {}\n  | {}", e, e.source_excerpt));
    interpreter::bind(&lowered)
}

/// Bind an expression and print the resulting value.
fn value(source: &str) -> String {
    bind(source)
        .unwrap_or_else(|e| panic!("bind failed: {}", e))
        .value()
        .to_js_string()
}

/// Bind a factory, invoke it and print what it returned.
fn call(source: &str) -> String {
    let mut component = bind(source).unwrap_or_else(|e| panic!("bind failed: {}", e));
    component
        .invoke()
        .unwrap_or_else(|e| panic!("invoke failed: {}", e))
        .to_js_string()
}

fn call_err(source: &str) -> String {
    let mut component = bind(source).unwrap_or_else(|e| panic!("bind failed: {}", e));
    component
        .invoke()
        .expect_err("expected invocation to fail")
        .to_string()
}

#[rstest]
#[case("1 + 2 * 3", "7")]
#[case("'a' + 1 + 2", "a12")]
#[case("1 + 2 + 'a'", "3a")]
#[case("10 / 4", "2.5")]
#[case("7 % 3", "1")]
#[case("2 ** 10", "1024")]
#[case("0.1 + 0.2", "0.30000000000000004")]
#[case("1 / 0", "Infinity")]
#[case("'5' * '2'", "10")]
#[case("[] + {}", "[object Object]")]
#[case("'b' > 'a'", "true")]
#[case("null == undefined", "true")]
#[case("null === undefined", "false")]
#[case("typeof null", "object")]
#[case("`sum: ${1 + 1}`", "sum: 2")]
fn operators(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(value(source), expected);
}

#[rstest]
#[case("null ?? 'd'", "d")]
#[case("0 || 'x'", "x")]
#[case("'' && 'x'", "")]
#[case("0 ?? 'x'", "0")]
fn logical_operators(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(value(source), expected);
}

#[rstest]
#[case("[1, 2, 3].map((n) => n * 2).join('-')", "2-4-6")]
#[case("[3, 1, 2].sort().join()", "1,2,3")]
#[case("[10, 9, 1].sort((a, b) => a - b).join()", "1,9,10")]
#[case("[1, [2, [3]]].flat().length", "3")]
#[case("[1, 2, 3].reduce((a, b) => a + b, 0)", "6")]
#[case("[1, 2, 3].includes(2)", "true")]
#[case("[1, 2, 3].filter((n) => n % 2).length", "2")]
#[case("[5, 6].findIndex((n) => n === 6)", "1")]
#[case("Array.from({ length: 3 }, (_, i) => i * i).join()", "0,1,4")]
#[case("Array.isArray([])", "true")]
fn array_methods(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(value(source), expected);
}

#[rstest]
#[case("'Hello'.toUpperCase()", "HELLO")]
#[case("'a,b,c'.split(',').length", "3")]
#[case("'  pad '.trim().padStart(5, '*')", "**pad")]
#[case("'abc'.slice(-2)", "bc")]
#[case("'x'.repeat(3)", "xxx")]
#[case("'a-b-c'.replaceAll('-', '+')", "a+b+c")]
#[case("'a-b-c'.replace('-', (m) => m + m)", "a--b-c")]
#[case("'héllo'.length", "5")]
#[case("'abc'.at(-1)", "c")]
fn string_methods(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(value(source), expected);
}

#[rstest]
#[case("(3.14159).toFixed(2)", "3.14")]
#[case("(255).toString(16)", "ff")]
#[case("(1234567.891).toLocaleString()", "1,234,567.891")]
#[case("Math.max(1, 5, 3)", "5")]
#[case("Math.round(2.5)", "3")]
#[case("parseInt('42px')", "42")]
#[case("Number('')", "0")]
#[case("Number.isInteger(4)", "true")]
fn numbers_and_math(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(value(source), expected);
}

#[test]
fn json_and_object_helpers() {
    assert_eq!(
        value("JSON.stringify({ a: [1, 'x', null], b: undefined })"),
        r#"{"a":[1,"x",null]}"#
    );
    assert_eq!(
        value("JSON.stringify({ a: 1 }, null, 2)"),
        "{\n  \"a\": 1\n}"
    );
    assert_eq!(value(r#"JSON.parse('{"z":1,"a":2}').z"#), "1");
    assert_eq!(value("Object.keys({ b: 1, a: 2 }).join()"), "b,a");
    assert_eq!(value("Object.entries({ a: 1 })[0].join('=')"), "a=1");
    assert_eq!(value("Object.assign({ a: 1 }, { b: 2 }).b"), "2");
}

#[test]
fn statements_in_function_bodies() {
    let source = "() => {
  let total = 0;
  for (let i = 1; i <= 4; i++) {
    if (i === 3) continue;
    total += i;
  }
  const words = [];
  for (const [key, val] of Object.entries({ a: 1, b: 2 })) {
    words.push(`${key}${val}`);
  }
  let n = 0;
  while (n < 3) n++;
  return total + ':' + words.join('') + ':' + n;
}";
    assert_eq!(call(source), "7:a1b2:3");
}

#[test]
fn destructuring_and_defaults() {
    let source = "() => {
  const { title = 'untitled', tags: [first, ...others] = [], ...rest } = { tags: ['a', 'b', 'c'], x: 1 };
  const pick = ({ name }: { name: string }, greeting = 'hi') => `${greeting} ${name}`;
  return [title, first, others.length, Object.keys(rest).join(), pick({ name: 'Ann' })].join('|');
}";
    assert_eq!(call(source), "untitled|a|2|x|hi Ann");
}

#[test]
fn hooks_render_statically() {
    let source = "() => {
  const [count, setCount] = React.useState(() => 3);
  const ref = React.useRef(null);
  const doubled = React.useMemo(() => count * 2, [count]);
  React.useEffect(() => { throw new Error('effects never run') }, []);
  setCount(100);
  return count + doubled + (ref.current === null ? 1 : 0);
}";
    assert_eq!(call(source), "10");
}

#[test]
fn elements_carry_type_props_and_key() {
    let mut component =
        bind("() => <ul className=\"list\">{[1, 2].map((i) => <li key={i}>{i}</li>)}</ul>").unwrap();
    let RuntimeValue::Element(list) = component.invoke().unwrap() else {
        panic!("expected an element");
    };
    assert_eq!(list.element_type.to_js_string(), "ul");
    let props = list.props.borrow();
    assert_eq!(props.get("className").unwrap().to_js_string(), "list");
    let RuntimeValue::Array(children) = props.get("children").unwrap() else {
        panic!("expected children array");
    };
    let keys: Vec<Option<String>> = children
        .borrow()
        .iter()
        .map(|child| match child {
            RuntimeValue::Element(e) => e.key.clone(),
            _ => None,
        })
        .collect();
    assert_eq!(keys, vec![Some("1".to_string()), Some("2".to_string())]);
}

#[test]
fn fragment_type_is_the_fragment_symbol() {
    let mut component = bind("() => <><b /></>").unwrap();
    let RuntimeValue::Element(fragment) = component.invoke().unwrap() else {
        panic!("expected an element");
    };
    assert!(matches!(fragment.element_type, RuntimeValue::Symbol(_)));
}

#[rstest]
#[case(
    "() => { const o = null; return o.x }",
    "TypeError: Cannot read properties of null (reading 'x')"
)]
#[case("() => { throw new Error('boom') }", "Error: boom")]
#[case("() => { throw 'plain' }", "plain")]
#[case(
    "() => { const f = () => f(); return f() }",
    "RangeError: Maximum call stack size exceeded"
)]
#[case(
    "() => { const a = 1; a = 2 }",
    "TypeError: Assignment to constant variable."
)]
#[case(
    "() => [].reduce((a, b) => a)",
    "TypeError: Reduce of empty array with no initial value"
)]
#[case("() => 'x'.repeat(-1)", "RangeError: Invalid count value: -1")]
#[case("() => { const [a] = 5 }", "TypeError: 5 is not iterable")]
#[case(
    "() => { const api = {}; return api.load() }",
    "TypeError: api.load is not a function"
)]
fn runtime_errors(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(call_err(source), expected);
}

#[test]
fn errors_are_catchable() {
    let source = "() => {
  const log = [];
  try {
    undefinedCall();
  } catch (e) {
    log.push(e.message);
  }
  return log.join();
}";
    // The free name is rejected before anything runs
    assert_eq!(
        bind(source).unwrap_err(),
        BindError::UndefinedVariable("undefinedCall".to_string())
    );

    let source = "() => {
  try {
    const f = () => f();
    f();
  } catch (e) {
    return e instanceof RangeError ? 'recovered' : 'wrong';
  }
}";
    assert_eq!(call(source), "recovered");
}

#[rstest]
#[case("() => fetch('/api')", "fetch")]
#[case("() => { console.log('x'); return null }", "console")]
#[case("() => <p>{window.location.href}</p>", "window")]
#[case("() => { localStorage.setItem('k', 'v') }", "localStorage")]
#[case("() => setTimeout(() => 1, 0)", "setTimeout")]
#[case("() => require('fs')", "require")]
fn ambient_symbols_are_unavailable(#[case] source: &str, #[case] name: &str) {
    assert_eq!(
        bind(source).unwrap_err(),
        BindError::UndefinedVariable(name.to_string())
    );
}

#[test]
fn intrinsics_are_available() {
    assert_eq!(value("Math.floor(JSON.parse('1.5'))"), "1");
    assert_eq!(value("isNaN(parseFloat('x'))"), "true");
    assert_eq!(value("typeof window"), "undefined");
}

#[test]
fn bindings_are_isolated() {
    let source = "(() => { let n = 0; return () => ++n })()";
    let mut first = bind(source).unwrap();
    assert_eq!(first.invoke().unwrap().to_number(), 1.0);
    assert_eq!(first.invoke().unwrap().to_number(), 2.0);
    let mut second = bind(source).unwrap();
    assert_eq!(second.invoke().unwrap().to_number(), 1.0);
}

#[test]
fn call_depth_is_configurable() {
    let source = "() => { const f = (n) => n === 0 ? 0 : 1 + f(n - 1); return f(10) }";
    assert_eq!(call(source), "10");

    let lowered = jsx::transform(source).unwrap();
    let mut shallow = interpreter::bind_with(&lowered, &BindOptions { max_call_depth: 4 }).unwrap();
    assert_eq!(
        shallow.invoke().unwrap_err().to_string(),
        "RangeError: Maximum call stack size exceeded"
    );
}

#[test]
fn bind_time_errors() {
    assert_eq!(
        bind("(() => { throw new TypeError('at bind') })()").unwrap_err(),
        BindError::Evaluation("TypeError: at bind".to_string())
    );
    assert!(!bind("42").unwrap().is_factory());
    assert!(!bind("<div />").unwrap().is_factory());
}
