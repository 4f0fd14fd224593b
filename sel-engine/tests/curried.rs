use sel_engine::{
    builtin, Bound, Builtin, Error, Kind, Lst, LstLiteral, Module, Num, NumLiteral, Registry,
    Result, Str, StrLiteral, Type, Value,
};

fn num(n: f64) -> Value {
    Value::num(NumLiteral::new(n))
}

fn lookup(registry: &Registry, name: &str) -> Value {
    registry
        .lookup_name(name)
        .unwrap_or_else(|| panic!("{name} is a builtin"))
}

#[test]
fn each_argument_moves_one_state_down() -> anyhow::Result<()> {
    let registry = Registry::with_builtins()?;
    let add = lookup(&registry, "add");
    assert_eq!(add.ty().to_string(), "Num -> Num -> Num");
    assert_eq!(add.repr(false), "<Num -> Num -> Num> Add2 { }");

    let add4 = add.apply(num(4.0))?;
    assert_eq!(add4.kind(), Kind::Fun);
    assert_eq!(
        add4.repr(false),
        "<Num -> Num> Add1 { arg_A=<Num> NumLiteral { n= 4 } }"
    );

    let mut sum = add4.apply(num(2.0))?;
    assert_eq!(sum.kind(), Kind::Num);
    assert_eq!(
        sum.repr(false),
        "<Num> Add0 {\n   arg_A=<Num> NumLiteral { n= 4 }\n   arg_B=<Num> NumLiteral { n= 2 }\n}"
    );
    assert_eq!(sum.as_num()?.value()?, 6.0);
    Ok(())
}

#[test]
fn partial_applications_are_reusable() -> anyhow::Result<()> {
    let registry = Registry::with_builtins()?;
    let sub = lookup(&registry, "sub");
    let from_ten = sub.apply(num(10.0))?;

    let mut a = from_ten.apply(num(1.0))?;
    let mut b = from_ten.copy().apply(num(4.0))?;
    let mut c = sub.apply(num(0.0))?.apply(num(3.0))?;

    assert_eq!(a.as_num()?.value()?, 9.0);
    assert_eq!(b.as_num()?.value()?, 6.0);
    assert_eq!(c.as_num()?.value()?, -3.0);
    Ok(())
}

#[test]
fn results_are_computed_when_pulled() -> anyhow::Result<()> {
    let registry = Registry::with_builtins()?;
    let mut head = lookup(&registry, "head").apply(Value::lst(LstLiteral::from_items(vec![num(1.0)])))?;
    assert_eq!(head.as_num()?.value()?, 1.0);

    let mut empty = lookup(&registry, "head")
        .apply(Value::lst(LstLiteral::new(vec![Type::Num], Vec::new())))?;
    assert!(empty.as_num()?.value().is_err());
    Ok(())
}

#[test]
fn a_complete_application_is_not_a_function() -> anyhow::Result<()> {
    let registry = Registry::with_builtins()?;
    let abs = lookup(&registry, "abs").apply(num(-5.0))?;
    assert!(matches!(
        abs.apply(num(1.0)),
        Err(Error::TypeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn arguments_are_coerced_to_the_parameter() -> anyhow::Result<()> {
    let registry = Registry::with_builtins()?;

    let mut rendered = lookup(&registry, "tostr").apply(num(12.0))?;
    let mut bytes = Vec::new();
    rendered.as_str()?.entire(&mut bytes)?;
    assert_eq!(bytes, b"12");

    let wrong = lookup(&registry, "add").apply(Value::str(StrLiteral::new("1")));
    assert!(matches!(wrong, Err(Error::Coercion { .. })));
    Ok(())
}

#[test]
fn map_takes_the_declared_list_shape() -> anyhow::Result<()> {
    let registry = Registry::with_builtins()?;
    let map = lookup(&registry, "map");
    assert_eq!(map.ty().to_string(), "(a -> b) -> [a]* -> [b]*");

    let map_tonum = map.apply(lookup(&registry, "tonum"))?;
    assert_eq!(map_tonum.ty().to_string(), "[Str*]* -> [Num]*");

    let words = LstLiteral::from_items(vec![
        Value::str(StrLiteral::new("1")),
        Value::str(StrLiteral::new("2")),
    ]);
    let mapped = map_tonum.apply(Value::lst(words))?;
    assert_eq!(mapped.ty().to_string(), "[Num]*");
    Ok(())
}

#[test]
fn zipwith_stops_at_the_shorter_list() -> anyhow::Result<()> {
    let registry = Registry::with_builtins()?;
    let mut sums = lookup(&registry, "zipwith")
        .apply(lookup(&registry, "add"))?
        .apply(Value::lst(LstLiteral::from_items(vec![num(1.0), num(2.0), num(3.0)])))?
        .apply(Value::lst(LstLiteral::from_items(vec![num(10.0), num(20.0)])))?;

    let list = sums.as_lst()?;
    let mut found = Vec::new();
    while let Some(mut item) = list.next_value()? {
        found.push(item.as_num()?.value()?);
    }
    assert_eq!(found, vec![11.0, 22.0]);
    Ok(())
}

fn never(_: Bound) -> Result<Value> {
    Err(Error::NotImplemented("never".into()))
}

static TOO_MANY: &[Builtin] = &[builtin("odd", "Num -> Num", 2, "", never)];
static TWICE: &[Builtin] = &[
    builtin("same", "Num -> Num", 1, "", never),
    builtin("same", "Str -> Str", 1, "", never),
];
static BAD_ARITY: &[Module] = &[Module {
    name: "bad",
    doc: "",
    builtins: TOO_MANY,
}];
static DUPLICATED: &[Module] = &[Module {
    name: "dup",
    doc: "",
    builtins: TWICE,
}];

#[test]
fn registry_rejects_inconsistent_catalogues() {
    assert!(Registry::from_modules(BAD_ARITY).is_err());
    assert!(Registry::from_modules(DUPLICATED).is_err());
}

#[test]
fn registry_exposes_signatures_and_docs() -> anyhow::Result<()> {
    let registry = Registry::with_builtins()?;
    assert!(!registry.is_empty());
    assert_eq!(registry.list_names().len(), registry.len());
    assert_eq!(
        registry.lookup_type("zipwith").map(ToString::to_string).as_deref(),
        Some("(a -> b -> c) -> [a]* -> [b]* -> [c]*")
    );
    assert_eq!(registry.lookup_module("split"), Some("text"));
    assert!(registry.lookup_doc("flip").is_some_and(|doc| !doc.is_empty()));
    assert!(registry.lookup_type("nope").is_none());
    Ok(())
}
