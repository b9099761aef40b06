//! Built-in page styles and the supported code highlight styles.

/// Built-in page stylesheets, embedded at compile time.
const BUILTIN_STYLES: &[(&str, &str)] = &[
    ("cyan", include_str!("../embed/css/cyan.css")),
    ("green", include_str!("../embed/css/green.css")),
    ("ink", include_str!("../embed/css/ink.css")),
    ("orange", include_str!("../embed/css/orange.css")),
    ("purple", include_str!("../embed/css/purple.css")),
];

/// highlight.js themes the bundled template can load from the CDN.
const CODE_STYLES: &[&str] = &[
    "a11y-dark",
    "a11y-light",
    "agate",
    "an-old-hope",
    "androidstudio",
    "arduino-light",
    "arta",
    "ascetic",
    "atom-one-dark",
    "atom-one-dark-reasonable",
    "atom-one-light",
    "brown-paper",
    "codepen-embed",
    "color-brewer",
    "dark",
    "default",
    "devibeans",
    "docco",
    "far",
    "felipec",
    "foundation",
    "github",
    "github-dark",
    "github-dark-dimmed",
    "gml",
    "googlecode",
    "gradient-dark",
    "gradient-light",
    "grayscale",
    "hybrid",
    "idea",
    "intellij-light",
    "ir-black",
    "isbl-editor-dark",
    "isbl-editor-light",
    "kimbie-dark",
    "kimbie-light",
    "lightfair",
    "lioshi",
    "magula",
    "mono-blue",
    "monokai",
    "monokai-sublime",
    "night-owl",
    "nnfx-dark",
    "nnfx-light",
    "nord",
    "obsidian",
    "panda-syntax-dark",
    "panda-syntax-light",
    "paraiso-dark",
    "paraiso-light",
    "pojoaque",
    "purebasic",
    "qtcreator-dark",
    "qtcreator-light",
    "rainbow",
    "routeros",
    "school-book",
    "shades-of-purple",
    "srcery",
    "stackoverflow-dark",
    "stackoverflow-light",
    "sunburst",
    "tokyo-night-dark",
    "tokyo-night-light",
    "tomorrow-night-blue",
    "tomorrow-night-bright",
    "vs",
    "vs2015",
    "xcode",
    "xt256",
];

/// Look up the stylesheet of a built-in style.
pub fn builtin_style(name: &str) -> Option<&'static str> {
    BUILTIN_STYLES
        .iter()
        .find(|(style, _)| *style == name)
        .map(|(_, css)| *css)
}

/// Names of all built-in styles.
pub fn builtin_style_names() -> Vec<&'static str> {
    BUILTIN_STYLES.iter().map(|(name, _)| *name).collect()
}

pub fn is_code_style(name: &str) -> bool {
    CODE_STYLES.contains(&name)
}

pub fn code_style_names() -> Vec<&'static str> {
    CODE_STYLES.to_vec()
}
