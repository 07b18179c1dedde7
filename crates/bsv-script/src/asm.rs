//! Token-level assembly with `$name` placeholders.
//!
//! Compiled contracts ship their locking script as assembly text in which
//! constructor parameters appear as `$name` tokens. [`Assembly`] keeps that
//! text as tokens, substitutes placeholders strictly by name through
//! [`Bindings`], and assembles the result into a [`Script`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::interpreter::scriptnum::encode_num;
use crate::literal::{small_int_opcode, Literal};
use crate::opcodes::*;
use crate::script::decode_hex_token;
use crate::{Script, ScriptError};

/// Prefix marking a placeholder token.
pub const PLACEHOLDER_PREFIX: char = '$';

/// One assembly token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// An opcode, with the exact mnemonic it was written as.
    Op { code: u8, mnemonic: &'static str },
    /// A data push.
    Push(Vec<u8>),
    /// An unresolved `$name` placeholder (name stored without the `$`).
    Placeholder(String),
}

impl Token {
    /// Parse a single whitespace-free token.
    pub fn parse(token: &str) -> Result<Self, ScriptError> {
        if let Some(name) = token.strip_prefix(PLACEHOLDER_PREFIX) {
            if name.is_empty() {
                return Err(ScriptError::InvalidOpcodeType(token.to_string()));
            }
            return Ok(Token::Placeholder(name.to_string()));
        }
        if let Some((code, mnemonic)) = lookup_mnemonic(token) {
            if (OP_DATA_1..=OP_PUSHDATA4).contains(&code) {
                return Err(ScriptError::InvalidOpcodeType(token.to_string()));
            }
            return Ok(Token::Op { code, mnemonic });
        }
        decode_hex_token(token).map(Token::Push)
    }

    /// The token a literal argument becomes once bound.
    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Bool(true) => Token::Op { code: OP_TRUE, mnemonic: "OP_TRUE" },
            Literal::Bool(false) => Token::Op { code: OP_FALSE, mnemonic: "OP_FALSE" },
            Literal::Int(n) => match small_int_opcode(n) {
                Some(code) => Token::Op { code, mnemonic: opcode_to_string(code) },
                None => Token::Push(encode_num(n)),
            },
            Literal::Bytes(b) => Token::Push(b.clone()),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Op { mnemonic, .. } => f.write_str(mnemonic),
            Token::Push(data) if data.is_empty() => f.write_str(opcode_to_string(OP_0)),
            Token::Push(data) => f.write_str(&hex::encode(data)),
            Token::Placeholder(name) => write!(f, "{PLACEHOLDER_PREFIX}{name}"),
        }
    }
}

/// Declared parameter names and the literals bound to them.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    declared: Vec<String>,
    values: HashMap<String, Literal>,
}

impl Bindings {
    /// Declare the parameter names that placeholders may refer to.
    ///
    /// # Returns
    /// Empty bindings, or `TemplateBinding` if a name is declared twice.
    pub fn new<I, S>(params: I) -> Result<Self, ScriptError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut declared: Vec<String> = Vec::new();
        for name in params {
            let name = name.into();
            if declared.contains(&name) {
                return Err(ScriptError::TemplateBinding(format!(
                    "parameter '{name}' is declared more than once"
                )));
            }
            declared.push(name);
        }
        Ok(Bindings { declared, values: HashMap::new() })
    }

    /// Declare `params` and bind `args` to them pairwise.
    ///
    /// # Returns
    /// The full bindings, or `TemplateBinding` when the counts differ or a
    /// name is declared twice.
    pub fn from_args<S: AsRef<str>>(params: &[S], args: Vec<Literal>) -> Result<Self, ScriptError> {
        if params.len() != args.len() {
            return Err(ScriptError::TemplateBinding(format!(
                "{} parameters declared but {} values supplied",
                params.len(),
                args.len()
            )));
        }
        let mut bindings = Bindings::new(params.iter().map(|p| p.as_ref().to_string()))?;
        for (name, value) in params.iter().zip(args) {
            bindings.bind(name.as_ref(), value)?;
        }
        Ok(bindings)
    }

    /// Bind a value to a declared parameter.
    ///
    /// # Returns
    /// `TemplateBinding` if `name` was never declared or is already bound.
    pub fn bind(&mut self, name: &str, value: Literal) -> Result<(), ScriptError> {
        if !self.declared.iter().any(|d| d == name) {
            return Err(ScriptError::TemplateBinding(format!(
                "no declared parameter named '{name}'"
            )));
        }
        if self.values.contains_key(name) {
            return Err(ScriptError::TemplateBinding(format!(
                "parameter '{name}' is bound more than once"
            )));
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Look up the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.values.get(name)
    }

    /// Declared parameter names in declaration order.
    pub fn declared(&self) -> &[String] {
        &self.declared
    }
}

/// Assembly text held as tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assembly {
    tokens: Vec<Token>,
}

impl Assembly {
    /// Parse whitespace-separated assembly text.
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let tokens = text
            .split_whitespace()
            .map(Token::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Assembly { tokens })
    }

    /// Build from already-parsed tokens.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Assembly { tokens }
    }

    /// Disassemble a script into canonical tokens.
    pub fn from_script(script: &Script) -> Result<Self, ScriptError> {
        let tokens = script
            .chunks()?
            .into_iter()
            .map(|chunk| match chunk.data {
                Some(data) => Token::Push(data),
                None => Token::Op { code: chunk.op, mnemonic: opcode_to_string(chunk.op) },
            })
            .collect();
        Ok(Assembly { tokens })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Names of the placeholders still present, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Placeholder(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Return true if no placeholders remain.
    pub fn is_bound(&self) -> bool {
        self.placeholders().next().is_none()
    }

    /// Substitute every placeholder by name.
    ///
    /// # Returns
    /// A fully bound copy, or `TemplateBinding` naming the first placeholder
    /// that has no declared parameter or no bound value.
    pub fn bind(&self, bindings: &Bindings) -> Result<Assembly, ScriptError> {
        let mut tokens = Vec::with_capacity(self.tokens.len());
        let mut substituted = 0usize;
        for token in &self.tokens {
            match token {
                Token::Placeholder(name) => {
                    if !bindings.declared().iter().any(|d| d == name) {
                        return Err(ScriptError::TemplateBinding(format!(
                            "placeholder '${name}' does not match any declared parameter"
                        )));
                    }
                    let value = bindings.get(name).ok_or_else(|| {
                        ScriptError::TemplateBinding(format!("unresolved placeholder '${name}'"))
                    })?;
                    tokens.push(Token::from_literal(value));
                    substituted += 1;
                }
                other => tokens.push(other.clone()),
            }
        }
        debug!(substituted, tokens = tokens.len(), "bound assembly placeholders");
        Ok(Assembly { tokens })
    }

    /// Assemble into script bytes.
    ///
    /// # Returns
    /// The script, or `TemplateBinding` if any placeholder is left.
    pub fn to_script(&self) -> Result<Script, ScriptError> {
        let mut script = Script::new();
        for token in &self.tokens {
            match token {
                Token::Op { code, .. } => script.append_opcodes(&[*code])?,
                Token::Push(data) => script.append_push_data(data)?,
                Token::Placeholder(name) => {
                    return Err(ScriptError::TemplateBinding(format!(
                        "unresolved placeholder '${name}'"
                    )))
                }
            }
        }
        Ok(script)
    }

    /// Append the tokens of another assembly.
    pub fn extend(&mut self, other: Assembly) {
        self.tokens.extend(other.tokens);
    }

    /// Append a single token.
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }
}

impl fmt::Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

impl FromStr for Assembly {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Assembly::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = "$x $y OP_ADD OP_EQUAL";

    #[test]
    fn test_parse_preserves_spelling() {
        for text in [
            DEMO,
            "OP_FALSE OP_RETURN 68656c6c6f",
            "OP_TRUE OP_NOP2 OP_DROP",
            "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG",
            "",
        ] {
            assert_eq!(Assembly::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        for bad in ["$", "OP_NOPE", "abc", "OP_PUSHDATA2"] {
            assert!(matches!(
                Assembly::parse(bad),
                Err(ScriptError::InvalidOpcodeType(_))
            ));
        }
    }

    #[test]
    fn test_bind_by_name() {
        let asm = Assembly::parse(DEMO).unwrap();
        assert_eq!(asm.placeholders().collect::<Vec<_>>(), vec!["x", "y"]);
        assert!(!asm.is_bound());

        let mut bindings = Bindings::new(["y", "x"]).unwrap();
        bindings.bind("x", Literal::from(4i64)).unwrap();
        bindings.bind("y", Literal::from(7i64)).unwrap();
        let bound = asm.bind(&bindings).unwrap();
        assert!(bound.is_bound());
        assert_eq!(bound.to_string(), "OP_4 OP_7 OP_ADD OP_EQUAL");
        assert_eq!(
            bound.to_script().unwrap().to_bytes(),
            &[OP_4, OP_7, OP_ADD, OP_EQUAL]
        );
    }

    #[test]
    fn test_bind_renders_each_literal_kind() {
        let asm = Assembly::parse("$a $b $c $d $e").unwrap();
        let bindings = Bindings::from_args(
            &["a", "b", "c", "d", "e"],
            vec![
                Literal::Bool(false),
                Literal::from(0i64),
                Literal::from(1000i64),
                Literal::Bytes(vec![0xbe, 0xef]),
                Literal::from(-1i64),
            ],
        )
        .unwrap();
        let bound = asm.bind(&bindings).unwrap();
        assert_eq!(bound.to_string(), "OP_FALSE OP_0 e803 beef OP_1NEGATE");
        assert_eq!(
            bound.to_script().unwrap().to_hex(),
            "0002e80302beef4f"
        );
    }

    #[test]
    fn test_repeated_placeholder_binds_each_occurrence() {
        let asm = Assembly::parse("$x $x OP_EQUAL").unwrap();
        let bindings = Bindings::from_args(&["x"], vec![Literal::from(20i64)]).unwrap();
        assert_eq!(asm.bind(&bindings).unwrap().to_string(), "14 14 OP_EQUAL");
    }

    #[test]
    fn test_unresolved_placeholder() {
        let asm = Assembly::parse(DEMO).unwrap();
        let mut bindings = Bindings::new(["x", "y"]).unwrap();
        bindings.bind("x", Literal::from(1i64)).unwrap();
        let err = asm.bind(&bindings).unwrap_err();
        assert!(matches!(err, ScriptError::TemplateBinding(ref m) if m.contains("$y")));
    }

    #[test]
    fn test_undeclared_placeholder() {
        let asm = Assembly::parse("$z OP_DROP").unwrap();
        let bindings = Bindings::from_args(&["x"], vec![Literal::from(1i64)]).unwrap();
        assert!(matches!(asm.bind(&bindings), Err(ScriptError::TemplateBinding(_))));
    }

    #[test]
    fn test_duplicate_and_unknown_bindings() {
        assert!(matches!(
            Bindings::new(["x", "x"]),
            Err(ScriptError::TemplateBinding(_))
        ));
        let mut bindings = Bindings::new(["x"]).unwrap();
        assert!(matches!(
            bindings.bind("nope", Literal::from(1i64)),
            Err(ScriptError::TemplateBinding(_))
        ));
        bindings.bind("x", Literal::from(1i64)).unwrap();
        assert!(matches!(
            bindings.bind("x", Literal::from(2i64)),
            Err(ScriptError::TemplateBinding(_))
        ));
        assert!(matches!(
            Bindings::from_args(&["x", "y"], vec![Literal::from(1i64)]),
            Err(ScriptError::TemplateBinding(_))
        ));
    }

    #[test]
    fn test_to_script_requires_binding() {
        let asm = Assembly::parse(DEMO).unwrap();
        assert!(matches!(asm.to_script(), Err(ScriptError::TemplateBinding(_))));
    }

    #[test]
    fn test_from_script_is_canonical() {
        let script = Script::from_asm("OP_TRUE OP_NOP2 deadbeef").unwrap();
        let asm = Assembly::from_script(&script).unwrap();
        assert_eq!(asm.to_string(), "OP_1 OP_CHECKLOCKTIMEVERIFY deadbeef");
        assert_eq!(asm.to_script().unwrap(), script);
    }
}
