
use error::EngineError;

/// Token struct
/// One whitespace-delimited token, along with the (1-based) line it was found on
#[derive(Copy, Clone, Debug)]
pub(crate) struct Token<'a> {
    pub text: &'a str,
    pub line: usize
}

/// TokenStream struct
/// Whitespace tokeniser shared by the text asset parsers. Directive fields are pulled one token
/// at a time without regard to line breaks; line numbers are kept so that the rest of a line can
/// be skipped and so that errors can say where they happened.
pub(crate) struct TokenStream<'a> {
    tokens: Vec<Token<'a>>,
    cursor: usize
}

impl<'a> TokenStream<'a> {

    pub fn new(source: &'a str) -> TokenStream<'a> {
        let tokens = source.lines()
            .enumerate()
            .flat_map(|(index, line)| {
                line.split_whitespace().map(move |text| Token { text, line: index + 1 })
            })
            .collect();
        TokenStream {
            tokens,
            cursor: 0
        }
    }

    pub fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.cursor).copied();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    pub fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.cursor).copied()
    }

    /// The next token, but only if it sits on the same line as the last token taken
    pub fn peek_same_line(&self) -> Option<Token<'a>> {
        let last_line = self.cursor.checked_sub(1)
            .map(|index| self.tokens[index].line)?;
        self.peek().filter(|token| token.line == last_line)
    }

    /// Discard whatever is left on the line of the last token taken
    pub fn skip_rest_of_line(&mut self) {
        while self.peek_same_line().is_some() {
            self.cursor += 1;
        }
    }

    /// Take the next token as a field of the given directive
    pub fn field(&mut self, directive: &Token<'a>) -> Result<Token<'a>, EngineError> {
        self.next().ok_or_else(|| EngineError::Malformed(format!(
            "line {}: unexpected end of file reading '{}'", directive.line, directive.text)))
    }

    pub fn f32_field(&mut self, directive: &Token<'a>) -> Result<f32, EngineError> {
        let token = self.field(directive)?;
        token.text.parse::<f32>()
            .map_err(|_| EngineError::Malformed(format!(
                "line {}: '{}' is not a number (in '{}')",
                token.line,
                token.text,
                directive.text)))
    }

    pub fn f32_fields<const N: usize>(
        &mut self,
        directive: &Token<'a>
    ) -> Result<[f32; N], EngineError> {
        let mut values = [0.0; N];
        for value in values.iter_mut() {
            *value = self.f32_field(directive)?;
        }
        Ok(values)
    }
}

/// Prefix the message of a Malformed error with the file it came from
pub(crate) fn in_file(path: &std::path::Path, e: EngineError) -> EngineError {
    match e {
        EngineError::Malformed(message) => EngineError::Malformed(
            format!("{}: {}", path.display(), message)),
        other => other
    }
}
