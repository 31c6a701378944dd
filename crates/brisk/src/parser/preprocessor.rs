//! Conditional compilation over the token stream
//!
//! Runs between the lexer and the parser. `#const` defines boolean
//! symbols, `#if`/`#else if`/`#else`/`#end if` select which tokens reach
//! the parser, and `#error` in a live region reports an error.

use std::collections::HashMap;

use crate::error::{RuntimeErrorDetail, SyntaxError};
use crate::lexer::{Lexeme, Literal, Location, Token};

struct Branch {
    parent_active: bool,
    taken: bool,
    active: bool,
    location: Location,
}

/// Filter `tokens` through the conditional-compilation directives.
/// `defines` seeds the symbol table (e.g. from the manifest `bs_const`).
pub fn preprocess(tokens: Vec<Token>, defines: &HashMap<String, bool>) -> (Vec<Token>, Vec<SyntaxError>) {
    let mut symbols: HashMap<String, bool> = defines.iter().map(|(k, v)| (k.to_lowercase(), *v)).collect();
    let mut stack: Vec<Branch> = Vec::new();
    let mut output = Vec::with_capacity(tokens.len());
    let mut errors = Vec::new();

    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        let active = stack.last().map_or(true, |b| b.active);

        if !token.kind.is_directive() {
            if active || matches!(token.kind, Lexeme::Newline | Lexeme::Eof) {
                output.push(token);
            }
            continue;
        }

        let mut rest = Vec::new();
        while let Some(next) = iter.peek() {
            if matches!(next.kind, Lexeme::Newline | Lexeme::Eof) {
                break;
            }
            if let Some(next) = iter.next() {
                rest.push(next);
            }
        }

        match token.kind {
            Lexeme::HashConst => {
                if active {
                    if let Err(err) = define_const(&rest, &mut symbols, &token.location) {
                        errors.push(err);
                    }
                }
            }
            Lexeme::HashIf => {
                let cond = if active {
                    evaluate(&rest, &symbols, &token.location).unwrap_or_else(|err| {
                        errors.push(err);
                        false
                    })
                } else {
                    false
                };
                stack.push(Branch {
                    parent_active: active,
                    taken: cond,
                    active: active && cond,
                    location: token.location.clone(),
                });
            }
            Lexeme::HashElseIf => match stack.last_mut() {
                Some(branch) => {
                    if branch.parent_active && !branch.taken {
                        let cond = evaluate(&rest, &symbols, &token.location).unwrap_or_else(|err| {
                            errors.push(err);
                            false
                        });
                        branch.active = cond;
                        branch.taken = cond;
                    } else {
                        branch.active = false;
                    }
                }
                None => errors.push(orphan(&token)),
            },
            Lexeme::HashElse => match stack.last_mut() {
                Some(branch) => {
                    branch.active = branch.parent_active && !branch.taken;
                    branch.taken = true;
                }
                None => errors.push(orphan(&token)),
            },
            Lexeme::HashEndIf => {
                if stack.pop().is_none() {
                    errors.push(orphan(&token));
                }
            }
            Lexeme::HashError => {
                if active {
                    let message = match &token.literal {
                        Some(Literal::String(message)) => message.clone(),
                        _ => String::new(),
                    };
                    errors.push(SyntaxError::new(
                        RuntimeErrorDetail::UserDefined,
                        format!("#error {message}"),
                        token.location.clone(),
                    ));
                }
            }
            _ => {}
        }
    }

    for branch in stack {
        errors.push(SyntaxError::new(
            RuntimeErrorDetail::UnterminatedBlock,
            "#if without matching #end if",
            branch.location,
        ));
    }

    (output, errors)
}

fn orphan(token: &Token) -> SyntaxError {
    SyntaxError::new(
        RuntimeErrorDetail::BadSyntax,
        format!("'{}' without a matching #if", token.text),
        token.location.clone(),
    )
}

fn define_const(rest: &[Token], symbols: &mut HashMap<String, bool>, location: &Location) -> Result<(), SyntaxError> {
    match rest {
        [name, eq, value] if name.kind == Lexeme::Identifier && eq.kind == Lexeme::Equal => {
            let resolved = evaluate(std::slice::from_ref(value), symbols, location)?;
            symbols.insert(name.text.to_lowercase(), resolved);
            Ok(())
        }
        _ => Err(SyntaxError::new(
            RuntimeErrorDetail::BadSyntax,
            "#const expects `name = true|false|name`",
            location.clone(),
        )),
    }
}

fn evaluate(rest: &[Token], symbols: &HashMap<String, bool>, location: &Location) -> Result<bool, SyntaxError> {
    match rest {
        [token] => match token.kind {
            Lexeme::True => Ok(true),
            Lexeme::False => Ok(false),
            Lexeme::Identifier => symbols.get(&token.text.to_lowercase()).copied().ok_or_else(|| {
                SyntaxError::new(
                    RuntimeErrorDetail::BadSyntax,
                    format!("Attempting to reference undefined #const '{}'", token.text),
                    token.location.clone(),
                )
            }),
            _ => Err(bad_condition(location)),
        },
        [not, inner] if not.kind == Lexeme::Not => {
            evaluate(std::slice::from_ref(inner), symbols, location).map(|v| !v)
        }
        _ => Err(bad_condition(location)),
    }
}

fn bad_condition(location: &Location) -> SyntaxError {
    SyntaxError::new(
        RuntimeErrorDetail::BadSyntax,
        "#if conditions must be true, false or a #const name",
        location.clone(),
    )
}
