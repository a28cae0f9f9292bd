//! Lazily-compiled pattern literals. Each call site compiles its pattern
//! once into a static and hands out a `&'static` reference afterwards.

#[macro_export]
macro_rules! selector {
    ($pattern: expr) => {{
        use ::once_cell::sync::Lazy;
        use ::scraper::Selector;
        static CACHED: Lazy<Selector> = Lazy::new(|| Selector::parse($pattern).unwrap());
        &*CACHED
    }};
}

#[macro_export]
macro_rules! regex {
    ($pattern: expr) => {{
        use ::once_cell::sync::Lazy;
        use ::regex::Regex;
        static CACHED: Lazy<Regex> = Lazy::new(|| Regex::new($pattern).unwrap());
        &*CACHED
    }};
}
