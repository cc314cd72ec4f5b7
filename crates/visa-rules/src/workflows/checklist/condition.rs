//! Restricted boolean expression language over applicant facts.
//!
//! Supports equality/inequality, `in [..]` membership, `&&`/`||`, and
//! parentheses over string/boolean literals and fact identifiers, e.g.
//! `sponsorType == 'self' && hasInvitation != true`. Deliberately not a
//! scripting language: evaluation always terminates and any failure (bad
//! syntax, unknown fact) resolves the whole condition to `false`.

use tracing::warn;

use super::domain::{FactMap, FactValue};

/// Failure modes of parsing or evaluating a condition. Callers treat every
/// variant as "condition is false"; the variants exist for logging.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConditionError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of condition")]
    UnexpectedEnd,
    #[error("condition references unknown fact '{0}'")]
    UnknownFact(String),
    #[error("fact '{0}' is not a boolean")]
    NotBoolean(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Text(String),
    Bool(bool),
    Eq,
    Ne,
    In,
    And,
    Or,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

fn tokenize(raw: &str) -> Result<Vec<Token>, ConditionError> {
    let mut tokens = Vec::new();
    let mut chars = raw.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                match chars.next() {
                    Some('=') => tokens.push(Token::Eq),
                    _ => return Err(ConditionError::UnexpectedChar('=')),
                }
            }
            '!' => {
                chars.next();
                match chars.next() {
                    Some('=') => tokens.push(Token::Ne),
                    _ => return Err(ConditionError::UnexpectedChar('!')),
                }
            }
            '&' => {
                chars.next();
                match chars.next() {
                    Some('&') => tokens.push(Token::And),
                    _ => return Err(ConditionError::UnexpectedChar('&')),
                }
            }
            '|' => {
                chars.next();
                match chars.next() {
                    Some('|') => tokens.push(Token::Or),
                    _ => return Err(ConditionError::UnexpectedChar('|')),
                }
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == quote => break,
                        Some(ch) => value.push(ch),
                        None => return Err(ConditionError::UnterminatedString),
                    }
                }
                tokens.push(Token::Text(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match ident.as_str() {
                    "in" => tokens.push(Token::In),
                    "true" => tokens.push(Token::Bool(true)),
                    "false" => tokens.push(Token::Bool(false)),
                    _ => tokens.push(Token::Ident(ident)),
                }
            }
            other => return Err(ConditionError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Fact(String),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Eq(Operand, Operand),
    Ne(Operand, Operand),
    In(Operand, Vec<Literal>),
    /// Bare boolean fact, e.g. `hasInvitation`.
    Truthy(String),
}

/// A parsed, evaluatable condition expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    expr: Expr,
}

impl Condition {
    pub fn parse(raw: &str) -> Result<Self, ConditionError> {
        let tokens = tokenize(raw)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or_expr()?;
        match parser.peek() {
            None => Ok(Self { expr }),
            Some(token) => Err(ConditionError::UnexpectedToken(format!("{token:?}"))),
        }
    }

    /// Evaluate against the facts map. Referencing a fact that is absent is
    /// an error so the caller can fail the whole condition closed.
    ///
    /// Both operands of `&&`/`||` are evaluated: an unknown-fact reference
    /// anywhere in the expression poisons the result rather than being
    /// skipped by short-circuiting.
    pub fn evaluate(&self, facts: &FactMap) -> Result<bool, ConditionError> {
        eval(&self.expr, facts)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ConditionError> {
        match self.next() {
            Some(token) if token == *expected => Ok(()),
            Some(token) => Err(ConditionError::UnexpectedToken(format!("{token:?}"))),
            None => Err(ConditionError::UnexpectedEnd),
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ConditionError> {
        let mut left = self.and_expr()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.next();
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ConditionError> {
        let mut left = self.comparison()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.next();
            let right = self.comparison()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, ConditionError> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.next();
            let inner = self.or_expr()?;
            self.expect(&Token::RParen)?;
            return Ok(inner);
        }

        let left = self.operand()?;
        match self.peek() {
            Some(Token::Eq) => {
                self.next();
                let right = self.operand()?;
                Ok(Expr::Eq(left, right))
            }
            Some(Token::Ne) => {
                self.next();
                let right = self.operand()?;
                Ok(Expr::Ne(left, right))
            }
            Some(Token::In) => {
                self.next();
                let list = self.literal_list()?;
                Ok(Expr::In(left, list))
            }
            _ => match left {
                Operand::Fact(name) => Ok(Expr::Truthy(name)),
                Operand::Literal(Literal::Bool(value)) => {
                    // A bare literal is degenerate but harmless.
                    Ok(Expr::Eq(
                        Operand::Literal(Literal::Bool(value)),
                        Operand::Literal(Literal::Bool(true)),
                    ))
                }
                Operand::Literal(Literal::Text(value)) => {
                    Err(ConditionError::UnexpectedToken(value))
                }
            },
        }
    }

    fn operand(&mut self) -> Result<Operand, ConditionError> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(Operand::Fact(name)),
            Some(Token::Text(value)) => Ok(Operand::Literal(Literal::Text(value))),
            Some(Token::Bool(value)) => Ok(Operand::Literal(Literal::Bool(value))),
            Some(token) => Err(ConditionError::UnexpectedToken(format!("{token:?}"))),
            None => Err(ConditionError::UnexpectedEnd),
        }
    }

    fn literal_list(&mut self) -> Result<Vec<Literal>, ConditionError> {
        self.expect(&Token::LBracket)?;
        let mut literals = Vec::new();
        loop {
            match self.next() {
                Some(Token::Text(value)) => literals.push(Literal::Text(value)),
                Some(Token::Bool(value)) => literals.push(Literal::Bool(value)),
                Some(Token::RBracket) if literals.is_empty() => return Ok(literals),
                Some(token) => return Err(ConditionError::UnexpectedToken(format!("{token:?}"))),
                None => return Err(ConditionError::UnexpectedEnd),
            }
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RBracket) => return Ok(literals),
                Some(token) => return Err(ConditionError::UnexpectedToken(format!("{token:?}"))),
                None => return Err(ConditionError::UnexpectedEnd),
            }
        }
    }
}

fn eval(expr: &Expr, facts: &FactMap) -> Result<bool, ConditionError> {
    match expr {
        Expr::Or(left, right) => {
            let l = eval(left, facts)?;
            let r = eval(right, facts)?;
            Ok(l || r)
        }
        Expr::And(left, right) => {
            let l = eval(left, facts)?;
            let r = eval(right, facts)?;
            Ok(l && r)
        }
        Expr::Eq(left, right) => Ok(values_equal(
            &resolve(left, facts)?,
            &resolve(right, facts)?,
        )),
        Expr::Ne(left, right) => Ok(!values_equal(
            &resolve(left, facts)?,
            &resolve(right, facts)?,
        )),
        Expr::In(operand, list) => {
            let value = resolve(operand, facts)?;
            Ok(list
                .iter()
                .any(|literal| values_equal(&value, &literal_value(literal))))
        }
        Expr::Truthy(name) => match facts.get(name) {
            Some(FactValue::Bool(value)) => Ok(*value),
            Some(FactValue::Text(_)) => Err(ConditionError::NotBoolean(name.clone())),
            None => Err(ConditionError::UnknownFact(name.clone())),
        },
    }
}

fn resolve(operand: &Operand, facts: &FactMap) -> Result<FactValue, ConditionError> {
    match operand {
        Operand::Fact(name) => facts
            .get(name)
            .cloned()
            .ok_or_else(|| ConditionError::UnknownFact(name.clone())),
        Operand::Literal(literal) => Ok(literal_value(literal)),
    }
}

fn literal_value(literal: &Literal) -> FactValue {
    match literal {
        Literal::Text(value) => FactValue::Text(value.clone()),
        Literal::Bool(value) => FactValue::Bool(*value),
    }
}

fn values_equal(left: &FactValue, right: &FactValue) -> bool {
    match (left, right) {
        (FactValue::Text(l), FactValue::Text(r)) => l == r,
        (FactValue::Bool(l), FactValue::Bool(r)) => l == r,
        // Cross-type comparisons never match.
        _ => false,
    }
}

/// Total gate used by the checklist generator: a document applies when its
/// condition is absent or evaluates true. Parse and evaluation failures are
/// logged and fail closed.
pub fn applies(condition: Option<&str>, facts: &FactMap) -> bool {
    let Some(raw) = condition.map(str::trim).filter(|c| !c.is_empty()) else {
        return true;
    };

    let parsed = match Condition::parse(raw) {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!(condition = raw, %error, "unparseable condition; excluding document");
            return false;
        }
    };

    match parsed.evaluate(facts) {
        Ok(result) => result,
        Err(error) => {
            warn!(condition = raw, %error, "condition evaluation failed closed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(pairs: &[(&str, FactValue)]) -> FactMap {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn equality_over_string_facts() {
        let facts = facts(&[("sponsorType", FactValue::Text("self".to_string()))]);
        assert!(applies(Some("sponsorType == 'self'"), &facts));
        assert!(!applies(Some("sponsorType == 'parents'"), &facts));
        assert!(applies(Some("sponsorType != 'parents'"), &facts));
    }

    #[test]
    fn membership_and_boolean_operators() {
        let facts = facts(&[
            ("sponsorType", FactValue::Text("employer".to_string())),
            ("hasInvitation", FactValue::Bool(true)),
        ]);
        assert!(applies(
            Some("sponsorType in ['self', 'employer']"),
            &facts
        ));
        assert!(applies(
            Some("sponsorType == 'employer' && hasInvitation == true"),
            &facts
        ));
        assert!(applies(
            Some("sponsorType == 'parents' || hasInvitation"),
            &facts
        ));
        assert!(!applies(
            Some("sponsorType == 'parents' && hasInvitation"),
            &facts
        ));
    }

    #[test]
    fn parentheses_group_subexpressions() {
        let facts = facts(&[
            ("sponsorType", FactValue::Text("self".to_string())),
            ("hasInvitation", FactValue::Bool(false)),
        ]);
        assert!(applies(
            Some("(sponsorType == 'self' || hasInvitation) && sponsorType != 'parents'"),
            &facts
        ));
    }

    #[test]
    fn unknown_fact_fails_the_whole_condition_closed() {
        let facts = facts(&[("sponsorType", FactValue::Text("self".to_string()))]);
        assert!(!applies(Some("maritalStatus == 'married'"), &facts));
        // Even a branch that would be true cannot rescue an unknown
        // reference elsewhere.
        assert!(!applies(
            Some("sponsorType == 'self' || maritalStatus == 'married'"),
            &facts
        ));
    }

    #[test]
    fn malformed_conditions_never_panic() {
        let facts = FactMap::new();
        for raw in [
            "sponsorType ==",
            "== 'self'",
            "sponsorType = 'self'",
            "sponsorType in ['self'",
            "sponsorType && ",
            "🙂",
            "'lone literal'",
        ] {
            assert!(!applies(Some(raw), &facts), "expected fail-closed for {raw:?}");
        }
    }

    #[test]
    fn absent_or_blank_condition_always_applies() {
        let facts = FactMap::new();
        assert!(applies(None, &facts));
        assert!(applies(Some("   "), &facts));
    }

    #[test]
    fn cross_type_comparison_is_false_not_an_error() {
        let facts = facts(&[("hasInvitation", FactValue::Bool(true))]);
        assert!(!applies(Some("hasInvitation == 'true'"), &facts));
        assert!(applies(Some("hasInvitation != 'true'"), &facts));
    }
}
