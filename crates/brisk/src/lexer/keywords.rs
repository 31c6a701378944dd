//! Reserved words

use super::token::Lexeme;

/// Look up a single reserved word. `word` must already be lowercase.
pub fn keyword(word: &str) -> Option<Lexeme> {
    let kind = match word {
        "and" => Lexeme::And,
        "or" => Lexeme::Or,
        "not" => Lexeme::Not,
        "mod" => Lexeme::Mod,
        "true" => Lexeme::True,
        "false" => Lexeme::False,
        "invalid" => Lexeme::Invalid,
        "if" => Lexeme::If,
        "else" => Lexeme::Else,
        "elseif" => Lexeme::ElseIf,
        "endif" => Lexeme::EndIf,
        "for" => Lexeme::For,
        "to" => Lexeme::To,
        "step" => Lexeme::Step,
        "next" => Lexeme::Next,
        "endfor" => Lexeme::EndFor,
        "while" => Lexeme::While,
        "endwhile" => Lexeme::EndWhile,
        "function" => Lexeme::Function,
        "endfunction" => Lexeme::EndFunction,
        "sub" => Lexeme::Sub,
        "endsub" => Lexeme::EndSub,
        "return" => Lexeme::Return,
        "print" => Lexeme::Print,
        "try" => Lexeme::Try,
        "catch" => Lexeme::Catch,
        "endtry" => Lexeme::EndTry,
        "throw" => Lexeme::Throw,
        "end" => Lexeme::End,
        "stop" => Lexeme::Stop,
        _ => return None,
    };
    Some(kind)
}

/// Two-word keywords such as `end if` or `for each`, keyed by their
/// lowercase first and second words.
pub fn compound_keyword(first: &str, second: &str) -> Option<Lexeme> {
    let kind = match (first, second) {
        ("end", "if") => Lexeme::EndIf,
        ("else", "if") => Lexeme::ElseIf,
        ("end", "function") => Lexeme::EndFunction,
        ("end", "sub") => Lexeme::EndSub,
        ("end", "for") => Lexeme::EndFor,
        ("end", "while") => Lexeme::EndWhile,
        ("end", "try") => Lexeme::EndTry,
        ("exit", "for") => Lexeme::ExitFor,
        ("exit", "while") => Lexeme::ExitWhile,
        ("continue", "for") => Lexeme::ContinueFor,
        ("continue", "while") => Lexeme::ContinueWhile,
        ("for", "each") => Lexeme::ForEach,
        _ => return None,
    };
    Some(kind)
}

/// Preprocessor directives following a `#`.
pub fn directive(first: &str, second: Option<&str>) -> Option<(Lexeme, bool)> {
    // The bool reports whether the second word was consumed.
    match (first, second) {
        ("if", _) => Some((Lexeme::HashIf, false)),
        ("else", Some("if")) => Some((Lexeme::HashElseIf, true)),
        ("elseif", _) => Some((Lexeme::HashElseIf, false)),
        ("else", _) => Some((Lexeme::HashElse, false)),
        ("end", Some("if")) => Some((Lexeme::HashEndIf, true)),
        ("endif", _) => Some((Lexeme::HashEndIf, false)),
        ("const", _) => Some((Lexeme::HashConst, false)),
        ("error", _) => Some((Lexeme::HashError, false)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_lowercase_only() {
        assert_eq!(keyword("while"), Some(Lexeme::While));
        assert_eq!(keyword("While"), None);
        assert_eq!(keyword("foo"), None);
    }

    #[test]
    fn test_compound_keywords() {
        assert_eq!(compound_keyword("end", "if"), Some(Lexeme::EndIf));
        assert_eq!(compound_keyword("for", "each"), Some(Lexeme::ForEach));
        assert_eq!(compound_keyword("end", "foo"), None);
    }

    #[test]
    fn test_directives() {
        assert_eq!(directive("else", Some("if")), Some((Lexeme::HashElseIf, true)));
        assert_eq!(directive("else", Some("x")), Some((Lexeme::HashElse, false)));
        assert_eq!(directive("endif", None), Some((Lexeme::HashEndIf, false)));
        assert_eq!(directive("pragma", None), None);
    }
}
