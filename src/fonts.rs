/// The standard Type1 fonts a signature can be rendered with.
/// Every conforming PDF reader ships these, so they are never embedded as font programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    TimesRoman,
    Courier,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    /// `BaseFont` name as used in the font dictionary.
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::Courier => "Courier",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Symbolic fonts have a built-in encoding and must not get `WinAnsiEncoding`.
    pub fn is_symbolic(self) -> bool {
        matches!(self, StandardFont::Symbol | StandardFont::ZapfDingbats)
    }

    /// Resource name used in the page `Font` dictionary.
    pub(crate) fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "SigHelv",
            StandardFont::TimesRoman => "SigTiRo",
            StandardFont::Courier => "SigCour",
            StandardFont::Symbol => "SigSymb",
            StandardFont::ZapfDingbats => "SigZaDb",
        }
    }
}

/// Maps logical font family names onto standard fonts.
/// Lookups are case sensitive; anything unknown gets the default font.
#[derive(Debug)]
pub struct FontRegistry {
    entries: &'static [(&'static str, StandardFont)],
    default: StandardFont,
}

static STANDARD_REGISTRY: FontRegistry = FontRegistry {
    entries: &[
        ("Cursive", StandardFont::ZapfDingbats),
        ("Script", StandardFont::ZapfDingbats),
        ("Serif", StandardFont::TimesRoman),
        ("Monospace", StandardFont::Courier),
        ("Fantasy", StandardFont::Symbol),
        ("Sans", StandardFont::Helvetica),
    ],
    default: StandardFont::Helvetica,
};

impl FontRegistry {
    pub fn standard() -> &'static FontRegistry {
        &STANDARD_REGISTRY
    }

    pub fn resolve(&self, logical_name: Option<&str>) -> StandardFont {
        let found = logical_name.and_then(|name| {
            self.entries
                .iter()
                .find(|(entry, _)| *entry == name)
                .map(|(_, font)| *font)
        });
        match found {
            Some(font) => font,
            None => {
                log::debug!(
                    "Unknown font {:?}, using {}.",
                    logical_name,
                    self.default.base_font()
                );
                self.default
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_names_resolve_to_standard_fonts() {
        let registry = FontRegistry::standard();
        assert_eq!(registry.resolve(Some("Serif")), StandardFont::TimesRoman);
        assert_eq!(registry.resolve(Some("Cursive")), StandardFont::ZapfDingbats);
        assert_eq!(registry.resolve(Some("Script")), StandardFont::ZapfDingbats);
        assert_eq!(registry.resolve(Some("Monospace")), StandardFont::Courier);
        assert_eq!(registry.resolve(Some("Fantasy")), StandardFont::Symbol);
        assert_eq!(registry.resolve(Some("Sans")), StandardFont::Helvetica);
    }

    #[test]
    fn unknown_names_fall_back_to_sans() {
        let registry = FontRegistry::standard();
        assert_eq!(registry.resolve(Some("Comic")), StandardFont::Helvetica);
        assert_eq!(registry.resolve(Some("serif")), StandardFont::Helvetica);
        assert_eq!(registry.resolve(Some("")), StandardFont::Helvetica);
        assert_eq!(registry.resolve(None), StandardFont::Helvetica);
    }

    #[test]
    fn symbolic_fonts() {
        assert!(StandardFont::Symbol.is_symbolic());
        assert!(StandardFont::ZapfDingbats.is_symbolic());
        assert!(!StandardFont::Courier.is_symbolic());
        assert_eq!(StandardFont::TimesRoman.base_font(), "Times-Roman");
    }
}
