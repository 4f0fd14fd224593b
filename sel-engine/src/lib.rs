mod application;
mod builtins;
mod coerce;
mod curry;
mod error;
mod repr;
mod script;
mod types;
mod value;

pub use crate::application::{App, AppOptions};
pub use crate::builtins::{Module, Registry, MODULES};
pub use crate::coerce::{coerce, LstFromStr, LstMapCoerce, StrFromLst, StrFromNum};
pub use crate::curry::{builtin, Bound, Builtin, Curried, Finish};
pub use crate::error::{Error, Result, Span};
pub use crate::repr::{Field, Repr};
pub use crate::script::{parse, Lexer, Parser, Scope, Token, TokenKind};
pub use crate::types::{Kind, Type};
pub use crate::value::{
    define, read_all, Define, Describe, Fun, FunChain, Input, Lst, LstLiteral, Num, NumLiteral,
    Output, Str, StrChunks, StrLiteral, Value,
};
