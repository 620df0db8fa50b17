//! Parse Gene Protein Reaction strings into [`Gpr`] trees
//!
//! Grammar:
//! ```text
//! expression -> or_expr
//! or_expr    -> and_expr ("or" and_expr)*
//! and_expr   -> unary ("and" unary)*
//! unary      -> "not" unary | primary
//! primary    -> GENE | "(" expression ")"
//! ```
//! `and` binds tighter than `or`, so `g1 or g2 and g3` reads as `g1 or (g2 and g3)`. Both
//! associate to the left.
use indexmap::IndexMap;
use thiserror::Error;

use crate::metabolic_model::gene::{Gene, Gpr};

#[derive(Debug, PartialEq, Clone)]
enum Token {
    Identifier(String),
    And,
    Or,
    Not,
    LeftParen,
    RightParen,
}

/// Parse a Gene Protein Reaction string into a GPR tree
///
/// Genes referenced by the rule which are not yet in `gene_map` are added to it.
///
/// # Examples
/// ```rust
/// use indexmap::IndexMap;
/// use bofpop_core::io::gpr_parse::parse_gpr;
/// let mut gene_map = IndexMap::new();
/// let gpr = parse_gpr("Rv0001 and Rv0002", &mut gene_map).unwrap();
/// assert_eq!(gpr.to_string(), "(Rv0001 and Rv0002)");
/// assert_eq!(gene_map.len(), 2);
/// ```
pub fn parse_gpr(input: &str, gene_map: &mut IndexMap<String, Gene>) -> Result<Gpr, GprParseError> {
    let tokens = lex(input)?;
    let mut parser = Parser {
        tokens,
        current: 0,
        gene_map,
    };
    let gpr = parser.or_expr()?;
    if parser.current < parser.tokens.len() {
        return Err(GprParseError::TrailingInput(parser.current));
    }
    Ok(gpr)
}

fn lex(input: &str) -> Result<Vec<Token>, GprParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        match c {
            '(' => tokens.push(Token::LeftParen),
            ')' => tokens.push(Token::RightParen),
            c if c.is_whitespace() => {}
            c if is_identifier_char(c) => {
                let mut word = String::from(c);
                while let Some((_, next)) = chars.peek() {
                    if !is_identifier_char(*next) {
                        break;
                    }
                    word.push(*next);
                    chars.next();
                }
                tokens.push(match word.to_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Identifier(word),
                });
            }
            other => return Err(GprParseError::InvalidCharacter(other, pos)),
        }
    }
    Ok(tokens)
}

/// Gene ids may contain letters, digits, and the punctuation found in common model files
fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | ':')
}

struct Parser<'gm> {
    tokens: Vec<Token>,
    current: usize,
    gene_map: &'gm mut IndexMap<String, Gene>,
}

impl Parser<'_> {
    fn or_expr(&mut self) -> Result<Gpr, GprParseError> {
        let mut expr = self.and_expr()?;
        while self.tokens.get(self.current) == Some(&Token::Or) {
            self.current += 1;
            expr = Gpr::or(expr, self.and_expr()?);
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Gpr, GprParseError> {
        let mut expr = self.unary()?;
        while self.tokens.get(self.current) == Some(&Token::And) {
            self.current += 1;
            expr = Gpr::and(expr, self.unary()?);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Gpr, GprParseError> {
        if self.tokens.get(self.current) == Some(&Token::Not) {
            self.current += 1;
            return Ok(Gpr::not(self.unary()?));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Gpr, GprParseError> {
        match self.tokens.get(self.current).cloned() {
            Some(Token::Identifier(id)) => {
                self.current += 1;
                if !self.gene_map.contains_key(&id) {
                    self.gene_map.insert(id.clone(), Gene::new(&id));
                }
                Ok(Gpr::GeneNode(id))
            }
            Some(Token::LeftParen) => {
                self.current += 1;
                let expr = self.or_expr()?;
                if self.tokens.get(self.current) != Some(&Token::RightParen) {
                    return Err(GprParseError::UnclosedParenthesis);
                }
                self.current += 1;
                Ok(expr)
            }
            _ => Err(GprParseError::ExpectedExpression(self.current)),
        }
    }
}

/// Errors raised while parsing a GPR string
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GprParseError {
    #[error("Invalid character {0:?} at position {1}")]
    InvalidCharacter(char, usize),
    #[error("Expected a gene or parenthesised expression at token {0}")]
    ExpectedExpression(usize),
    #[error("Expected ')' after expression")]
    UnclosedParenthesis,
    #[error("Unexpected input after token {0}")]
    TrailingInput(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_gene() {
        let mut genes = IndexMap::new();
        assert_eq!(
            parse_gpr("Rv0023", &mut genes).unwrap(),
            Gpr::gene("Rv0023")
        );
        assert!(genes.contains_key("Rv0023"));
    }

    #[test]
    fn grouping() {
        let mut genes = IndexMap::new();
        let gpr = parse_gpr("Rv0001 and (Rv0002 or Rv0003)", &mut genes).unwrap();
        assert_eq!(
            gpr,
            Gpr::and(
                Gpr::gene("Rv0001"),
                Gpr::or(Gpr::gene("Rv0002"), Gpr::gene("Rv0003"))
            )
        );
        assert_eq!(genes.len(), 3);
    }

    #[test]
    fn chained_and_negated() {
        let mut genes = IndexMap::new();
        let gpr = parse_gpr("not Rv0003 or Rv0001 AND Rv0002", &mut genes).unwrap();
        assert_eq!(format!("{}", gpr), "((not Rv0003) or (Rv0001 and Rv0002))");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let mut genes = IndexMap::new();
        assert_eq!(
            parse_gpr("g1 or g2 and g3", &mut genes).unwrap(),
            Gpr::or(Gpr::gene("g1"), Gpr::and(Gpr::gene("g2"), Gpr::gene("g3")))
        );
        assert_eq!(
            parse_gpr("g1 and g2 or g3 and g4", &mut genes).unwrap(),
            Gpr::or(
                Gpr::and(Gpr::gene("g1"), Gpr::gene("g2")),
                Gpr::and(Gpr::gene("g3"), Gpr::gene("g4"))
            )
        );
        assert_eq!(
            parse_gpr("g1 or g2 or g3", &mut genes).unwrap(),
            Gpr::or(Gpr::or(Gpr::gene("g1"), Gpr::gene("g2")), Gpr::gene("g3"))
        );
    }

    #[test]
    fn bigg_style_ids() {
        let mut genes = IndexMap::new();
        let gpr = parse_gpr("(b0001.1 or s0001)", &mut genes).unwrap();
        assert_eq!(gpr.genes().len(), 2);
    }

    #[test]
    fn malformed_rules() {
        let mut genes = IndexMap::new();
        assert_eq!(
            parse_gpr("(g1 and g2", &mut genes),
            Err(GprParseError::UnclosedParenthesis)
        );
        assert_eq!(
            parse_gpr("g1 and", &mut genes),
            Err(GprParseError::ExpectedExpression(2))
        );
        assert!(matches!(
            parse_gpr("g1 & g2", &mut genes),
            Err(GprParseError::InvalidCharacter('&', 3))
        ));
        assert_eq!(
            parse_gpr("g1 g2", &mut genes),
            Err(GprParseError::TrailingInput(1))
        );
    }
}
