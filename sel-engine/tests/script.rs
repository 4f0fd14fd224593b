use std::io::Cursor;

use sel_engine::{App, AppOptions, Error, Lexer, Parser, Registry, TokenKind};

fn app(options: AppOptions) -> anyhow::Result<App> {
    Ok(App::new(Registry::with_builtins()?, options))
}

fn built(source: &str) -> anyhow::Result<App> {
    let mut app = app(AppOptions::default())?;
    app.build(source)?;
    Ok(app)
}

fn run(app: &App, input: &str) -> anyhow::Result<String> {
    let mut output = Vec::new();
    app.run(Cursor::new(input.as_bytes().to_vec()), &mut output)?;
    Ok(String::from_utf8(output)?)
}

fn parse_error(source: &str) -> String {
    let mut app = app(AppOptions::default()).expect("builtins register");
    match app.build(source) {
        Err(err @ Error::Parse { .. }) => err.to_string(),
        Err(other) => panic!("{source:?} failed with a non-parse error: {other}"),
        Ok(()) => panic!("{source:?} parsed"),
    }
}

#[test]
fn malformed_scripts_are_reported() {
    let cases = [
        ("", "expected atom but got end of script instead"),
        ("[]", "expected element but got empty sub-script instead"),
        ("tonum]", "unmatched closing ']'"),
        ("nope", "unknown name 'nope'"),
        ("def", "expected name but got end of script instead"),
        (
            "def x 1",
            "expected docstring for 'x' but got literal number of value 1 instead",
        ),
        ("def add :doc: 1", "cannot redefine already known name 'add'"),
        (":abc", "expected closing ':' but got end of script instead"),
        ("tonum $", "unexpected character '$'"),
        ("{1, 2", "expected ',' or '}' but got end of script instead"),
        ("[tonum", "expected ',' or ']' but got end of script instead"),
    ];
    for (source, expected) in cases {
        assert_eq!(parse_error(source), expected, "parsing {source:?}");
    }
}

#[test]
fn operators_become_flipped_builtins() -> anyhow::Result<()> {
    let app = built("tonum, +1, tostr")?;
    assert_eq!(app.ty()?.to_string(), "Str* -> Str");
    assert_eq!(
        app.repr(false)?,
        "App {\n\
        \x20  f= <Str* -> Str> FunChain {\n\
        \x20     f[0]=<Str* -> Num> Tonum1 { }\n\
        \x20     f[1]=<Num -> Num> Flip0 {\n\
        \x20        arg_A=<Num -> Num -> Num> Add2 { }\n\
        \x20        arg_B=<Num> NumLiteral { n= 1 }\n\
        \x20     }\n\
        \x20     f[2]=<Num -> Str> Tostr1 { }\n\
        \x20  }\n\
        \x20  user= {}\n\
        }"
    );
    Ok(())
}

#[test]
fn repr_fails_before_build() -> anyhow::Result<()> {
    let app = app(AppOptions::default())?;
    assert!(app.repr(false).is_err());
    assert!(app.ty().is_err());
    Ok(())
}

#[test]
fn runs_a_simple_pipeline() -> anyhow::Result<()> {
    let app = built("tonum, add 1, tostr")?;
    assert_eq!(run(&app, "42\n")?, "43");
    Ok(())
}

#[test]
fn runs_a_mapped_sub_script() -> anyhow::Result<()> {
    let app = built("split :_:, map [tonum, -1, tostr], join :#:")?;
    assert_eq!(run(&app, "42_37")?, "41#36");

    let app = built("split : :, map [tonum, add 1, tostr], join ::::")?;
    assert_eq!(run(&app, "1 2 3")?, "2:3:4");
    Ok(())
}

#[test]
fn percent_flips_a_builtin() -> anyhow::Result<()> {
    let app = built("tonum, %-1, tostr")?;
    assert_eq!(app.ty()?.to_string(), "Str* -> Str");
    assert_eq!(run(&app, "10")?, "-9");
    Ok(())
}

#[test]
fn definitions_are_stages_and_names() -> anyhow::Result<()> {
    let app = built(
        "split : :, map tonum, \
         def incall :increment every number in the list: [map +1], \
         incall, incall, incall, \
         map tostr, join : :",
    )?;
    assert_eq!(app.user_names(), ["incall"]);
    assert!(app.lookup_name_user("incall").is_some());
    assert!(app.lookup_name_user("map").is_none());
    assert_eq!(run(&app, "1 2 3")?, "5 6 7");
    Ok(())
}

#[test]
fn semicolons_discard_definitions() -> anyhow::Result<()> {
    let app = built(
        r"def mylines:: [split :\n:];
          def ltonum:: [map tonum];
          def mappp:: [map +1];
          def ltostr:: [map tostr];
          def myunlines:: [join :\n:];
          mylines, ltonum, mappp, ltostr, myunlines",
    )?;
    assert_eq!(app.user_names(), ["ltonum", "ltostr", "mappp", "mylines", "myunlines"]);
    assert_eq!(run(&app, "1\na\n2\nb\n3\nc")?, "2\n1\n3\n1\n4\n1");
    Ok(())
}

#[test]
fn user_definitions_show_in_repr() -> anyhow::Result<()> {
    let mut app = app(AppOptions {
        not_fun: true,
        ..AppOptions::default()
    })?;
    app.build("def one :the number one: 1")?;
    let repr = app.repr(false)?;
    assert!(repr.contains("\n   user= {\n      [one]= <Num> NumDefine"), "{repr}");
    assert!(repr.ends_with("\n   }\n}"), "{repr}");

    assert!(matches!(
        app.build("def one :again: 2"),
        Err(Error::Parse { .. })
    ));
    Ok(())
}

#[test]
fn plain_values_need_not_fun() -> anyhow::Result<()> {
    let script = "{3, 1, 2}, reverse, join :-:";

    let app = built(script)?;
    assert_eq!(app.ty()?.to_string(), "Str*");
    assert!(run(&app, "").is_err());

    let mut app = self::app(AppOptions {
        not_fun: true,
        ..AppOptions::default()
    })?;
    app.build(script)?;
    assert_eq!(run(&app, "ignored")?, "2-1-3");
    Ok(())
}

#[test]
fn strict_type_refuses_input_coercion() -> anyhow::Result<()> {
    let script = "map tonum, map tostr, join :-:";

    let lenient = built(script)?;
    assert_eq!(run(&lenient, "123")?, "1-2-3");

    let mut strict = app(AppOptions {
        strict_type: true,
        ..AppOptions::default()
    })?;
    strict.build(script)?;
    assert!(matches!(
        run(&strict, "123").map_err(|err| err.downcast::<Error>()),
        Err(Ok(Error::TypeMismatch { .. }))
    ));

    strict.build("tonum, tostr")?;
    assert_eq!(run(&strict, "7")?, "7");
    Ok(())
}

#[test]
fn picks_from_untyped_lists_fail_only_when_run() -> anyhow::Result<()> {
    for script in ["head {}", "last {}", "index {} 0"] {
        let mut app = app(AppOptions {
            not_fun: true,
            ..AppOptions::default()
        })?;
        app.build(script)?;
        assert!(
            matches!(
                run(&app, "").map_err(|err| err.downcast::<Error>()),
                Err(Ok(Error::Runtime(_)))
            ),
            "running {script:?}"
        );
    }

    let mut app = app(AppOptions {
        not_fun: true,
        ..AppOptions::default()
    })?;
    app.build("{1, :two:}, head")?;
    assert_eq!(run(&app, "")?, "1");
    app.build("{1, :two:}, last")?;
    assert_eq!(run(&app, "")?, "two");
    Ok(())
}

#[test]
fn parser_ends_token_lists_itself() -> anyhow::Result<()> {
    let mut app = app(AppOptions::default())?;
    let err = match Parser::new(Vec::new(), &mut app).parse() {
        Err(err) => err.to_string(),
        Ok(value) => anyhow::bail!("parsed {value:?} from no tokens"),
    };
    assert_eq!(err, "expected atom but got end of script instead");

    let mut tokens = Lexer::new("tonum, tostr").tokenize()?;
    assert_eq!(tokens.pop().map(|token| token.kind), Some(TokenKind::Eof));
    let value = Parser::new(tokens, &mut app).parse()?;
    assert_eq!(value.ty().to_string(), "Str* -> Str");
    Ok(())
}
