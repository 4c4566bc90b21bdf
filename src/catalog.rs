//! Currencies the dashboard offers, with the country whose flag represents each.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub code: &'static str,
    pub name: &'static str,
    pub country: &'static str,
}

const fn entry(code: &'static str, name: &'static str, country: &'static str) -> CatalogEntry {
    CatalogEntry {
        code,
        name,
        country,
    }
}

pub const CATALOG: &[CatalogEntry] = &[
    entry("USD", "US Dollar", "us"),
    entry("EUR", "Euro", "eu"),
    entry("GBP", "Pound Sterling", "gb"),
    entry("JPY", "Japanese Yen", "jp"),
    entry("CHF", "Swiss Franc", "ch"),
    entry("CNY", "Chinese Yuan", "cn"),
    entry("AUD", "Australian Dollar", "au"),
    entry("CAD", "Canadian Dollar", "ca"),
    entry("HKD", "Hong Kong Dollar", "hk"),
    entry("SGD", "Singapore Dollar", "sg"),
    entry("SEK", "Swedish Krona", "se"),
    entry("NOK", "Norwegian Krone", "no"),
    entry("DKK", "Danish Krone", "dk"),
    entry("PLN", "Polish Zloty", "pl"),
    entry("TRY", "Turkish Lira", "tr"),
    entry("KZT", "Kazakhstani Tenge", "kz"),
    entry("BYN", "Belarusian Ruble", "by"),
    entry("UAH", "Ukrainian Hryvnia", "ua"),
    entry("INR", "Indian Rupee", "in"),
    entry("AED", "UAE Dirham", "ae"),
    entry("BRL", "Brazilian Real", "br"),
    entry("ZAR", "South African Rand", "za"),
    entry("RUB", "Russian Ruble", "ru"),
    entry("MXN", "Mexican Peso", "mx"),
    entry("ILS", "Israeli Shekel", "il"),
    entry("KRW", "South Korean Won", "kr"),
    entry("CZK", "Czech Koruna", "cz"),
    entry("HUF", "Hungarian Forint", "hu"),
    entry("RON", "Romanian Leu", "ro"),
    entry("BGN", "Bulgarian Lev", "bg"),
];

/// Currencies missing from [`CATALOG`] that still have a flag.
const EXTRA_COUNTRIES: &[(&str, &str)] = &[("NZD", "nz"), ("TWD", "tw")];

pub fn lookup(code: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}

/// Lower-case ISO country code for the flag of `code`.
pub fn country_for(code: &str) -> Option<&'static str> {
    lookup(code).map(|e| e.country).or_else(|| {
        EXTRA_COUNTRIES
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
            .map(|(_, country)| *country)
    })
}

/// Catalog entries matching `term` by code or name, excluding `exclude`.
///
/// An empty term lists every entry not excluded.
pub fn search<'a>(term: &str, exclude: &[String]) -> Vec<&'a CatalogEntry> {
    let term = term.trim().to_lowercase();
    CATALOG
        .iter()
        .filter(|e| !exclude.iter().any(|c| c == e.code))
        .filter(|e| {
            term.is_empty()
                || e.code.to_lowercase().contains(&term)
                || e.name.to_lowercase().contains(&term)
        })
        .collect()
}
