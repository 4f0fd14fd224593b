use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{BufRead, Write};

use log::debug;

use crate::builtins::Registry;
use crate::coerce::coerce;
use crate::error::{Error, Result};
use crate::repr::Repr;
use crate::script::{self, Scope};
use crate::types::Type;
use crate::value::{Input, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct AppOptions {
    /// The application must accept the input text as is.
    pub strict_type: bool,
    /// The script may be a plain value rather than a function.
    pub not_fun: bool,
}

/// A built script together with the names it defined.
pub struct App {
    registry: Registry,
    options: AppOptions,
    user: BTreeMap<String, Value>,
    root: Option<Value>,
}

impl App {
    pub fn new(registry: Registry, options: AppOptions) -> Self {
        Self {
            registry,
            options,
            user: BTreeMap::new(),
            root: None,
        }
    }

    pub fn options(&self) -> AppOptions {
        self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Parses `source` into the root value, replacing any previous one.
    pub fn build(&mut self, source: &str) -> Result<()> {
        let root = script::parse(source, self)?;
        debug!("built application of type {}", root.ty());
        self.root = Some(root);
        Ok(())
    }

    pub fn root(&self) -> Result<&Value> {
        self.root
            .as_ref()
            .ok_or_else(|| Error::runtime("no application was built"))
    }

    pub fn ty(&self) -> Result<&Type> {
        self.root().map(Value::ty)
    }

    /// A copy of a user definition; the stored value is never handed out.
    pub fn lookup_name_user(&self, name: &str) -> Option<Value> {
        self.user.get(name).map(Value::copy)
    }

    /// User definitions shadow builtins.
    pub fn lookup_name(&self, name: &str) -> Option<Value> {
        self.lookup_name_user(name)
            .or_else(|| self.registry.lookup_name(name))
    }

    pub fn define_name_user(&mut self, name: &str, value: Value) -> Result<()> {
        if self.lookup_name(name).is_some() {
            return Err(Error::runtime(format!("name '{name}' is already defined")));
        }
        self.user.insert(name.to_string(), value);
        Ok(())
    }

    pub fn user_names(&self) -> Vec<&str> {
        self.user.keys().map(String::as_str).collect()
    }

    /// Streams `input` through the application into `output`.
    pub fn run(&self, input: impl BufRead + 'static, output: &mut dyn Write) -> Result<()> {
        let root = self.root()?;

        let result = match root.as_fun() {
            Ok(f) => {
                let from = f.ty().from().cloned().unwrap_or_else(|| Type::unk("a"));
                let text = Type::str(true);
                if self.options.strict_type && !from.equals(&text) {
                    return Err(Error::TypeMismatch { from, to: text });
                }
                let arg = coerce(Value::str(Input::new(input)), &from)?;
                debug!("running with input as {}", arg.ty());
                f.apply(arg)?
            }
            Err(_) if self.options.not_fun => {
                debug!("streaming plain value of type {}", root.ty());
                root.copy()
            }
            Err(err) => return Err(err),
        };

        let mut result = coerce(result, &Type::str(true))?;
        result.as_str()?.entire(output)?;
        output.flush()?;
        debug!("run finished");
        Ok(())
    }

    /// `App { f= ... user= {...} }`, see [`Value::repr`].
    pub fn repr(&self, single_line: bool) -> Result<String> {
        let root = self.root()?;
        let (open, sep, close) = if single_line {
            ("App { ", " ", " }")
        } else {
            ("App {\n   ", "\n   ", "\n}")
        };

        let mut out = String::from(open);
        out.push_str("f= ");
        // writing into a String cannot fail
        let _ = root.repr_into(&mut Repr::new(&mut out, single_line).at_depth(1));
        out.push_str(sep);

        out.push_str("user= {");
        for (name, value) in &self.user {
            if single_line {
                let _ = write!(out, " [{name}]= ");
            } else {
                let _ = write!(out, "\n      [{name}]= ");
            }
            let _ = value.repr_into(&mut Repr::new(&mut out, single_line).at_depth(2));
        }
        if !self.user.is_empty() {
            out.push_str(if single_line { " " } else { "\n   " });
        }
        out.push('}');

        out.push_str(close);
        Ok(out)
    }
}

impl Scope for App {
    fn lookup_name(&self, name: &str) -> Option<Value> {
        App::lookup_name(self, name)
    }

    fn define_name_user(&mut self, name: &str, value: Value) -> Result<()> {
        App::define_name_user(self, name, value)
    }
}
