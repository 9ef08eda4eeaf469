//! Static color theme and icon registry of the application shell.

use dioxus::prelude::*;

/// Material grey 600.
pub const PRIMARY: &str = "#757575";
/// Material teal 500.
pub const ACCENT: &str = "#009688";

/// The custom `defaultPrimary` palette, hue to color.
pub const DEFAULT_PRIMARY_PALETTE: [(&str, &str); 14] = [
    ("50", "#FFFFFF"),
    ("100", "rgb(255, 198, 197)"),
    ("200", "#E75753"),
    ("300", "#E75753"),
    ("400", "#E75753"),
    ("500", "#E75753"),
    ("600", "#E75753"),
    ("700", "#E75753"),
    ("800", "#E75753"),
    ("900", "#E75753"),
    ("A100", "#E75753"),
    ("A200", "#E75753"),
    ("A400", "#E75753"),
    ("A700", "#E75753"),
];

/// Warnings use the custom palette's default hue.
pub const WARN: &str = "#E75753";

#[derive(Debug, Clone, Copy)]
pub struct IconDef {
    pub name: &'static str,
    pub asset: Asset,
    pub size: u32,
}

pub const ICONS: [IconDef; 1] = [IconDef {
    name: "user",
    asset: asset!("/assets/images/user.svg"),
    size: 64,
}];

pub fn icon(name: &str) -> Option<&'static IconDef> {
    ICONS.iter().find(|i| i.name == name)
}

/// The theme as a `:root` block of CSS custom properties.
pub fn css_variables() -> String {
    let mut css = String::from(":root {\n");
    css.push_str(&format!("  --color-primary: {PRIMARY};\n"));
    css.push_str(&format!("  --color-accent: {ACCENT};\n"));
    css.push_str(&format!("  --color-warn: {WARN};\n"));
    for (hue, color) in DEFAULT_PRIMARY_PALETTE {
        css.push_str(&format!("  --default-primary-{}: {color};\n", hue.to_lowercase()));
    }
    css.push('}');
    css
}
