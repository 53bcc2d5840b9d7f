/// The template syntax configuration.
///
/// This sets the delimiter pair that every template starts with. Templates
/// can still redefine their delimiters with a `{{=<% %>=}}` tag, this only
/// affects the rest of that template.
///
/// Use [`Syntax::default()`] to get the default syntax configuration and
/// [`Syntax::builder()`] to create a custom syntax configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    pub(crate) start: String,
    pub(crate) end: String,
}

/// A builder for the syntax configuration.
///
/// This struct is typically created using [`Syntax::builder()`].
#[derive(Debug, Clone)]
pub struct SyntaxBuilder {
    delimiters: Option<(String, String)>,
}

impl Default for Syntax {
    /// Returns the default syntax configuration.
    ///
    /// This is equivalent to the following.
    /// ```
    /// use whisker::Syntax;
    ///
    /// let syntax = Syntax::builder().delimiters("{{", "}}").build();
    /// assert_eq!(syntax, Syntax::default());
    /// ```
    #[inline]
    fn default() -> Self {
        Self {
            start: String::from("{{"),
            end: String::from("}}"),
        }
    }
}

impl Syntax {
    /// Create a new syntax builder.
    ///
    /// # Examples
    ///
    /// ```
    /// let syntax = whisker::Syntax::builder().delimiters("<%", "%>").build();
    /// ```
    #[inline]
    pub fn builder() -> SyntaxBuilder {
        SyntaxBuilder::new()
    }

    /// The start delimiter, e.g. `{{`.
    pub fn start(&self) -> &str {
        &self.start
    }

    /// The end delimiter, e.g. `}}`.
    pub fn end(&self) -> &str {
        &self.end
    }
}

impl SyntaxBuilder {
    /// Creates a new syntax builder.
    #[inline]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self { delimiters: None }
    }

    /// Set the delimiter pair.
    ///
    /// # Panics
    ///
    /// If either of the strings are empty or contain whitespace or `=`.
    #[inline]
    pub fn delimiters(&mut self, start: &str, end: &str) -> &mut Self {
        assert!(
            is_valid_delimiter(start) && is_valid_delimiter(end),
            "delimiters must be non-empty and must not contain whitespace or `=`"
        );
        self.delimiters = Some((start.to_owned(), end.to_owned()));
        self
    }

    /// Builds the syntax configuration.
    pub fn build(&self) -> Syntax {
        match &self.delimiters {
            Some((start, end)) => Syntax {
                start: start.clone(),
                end: end.clone(),
            },
            None => Syntax::default(),
        }
    }
}

/// Whether the string can be used as a delimiter.
pub(crate) fn is_valid_delimiter(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || c == '=')
}
