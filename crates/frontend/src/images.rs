//! Bundled marker and popup images.

use dioxus::prelude::*;

const HOME_ICON: Asset = asset!("/assets/images/green_home.svg");
const WINK: Asset = asset!("/assets/images/wink.svg");

const AVATARS: [Asset; 11] = [
    asset!("/assets/images/0.svg"),
    asset!("/assets/images/1.svg"),
    asset!("/assets/images/2.svg"),
    asset!("/assets/images/3.svg"),
    asset!("/assets/images/4.svg"),
    asset!("/assets/images/5.svg"),
    asset!("/assets/images/6.svg"),
    asset!("/assets/images/7.svg"),
    asset!("/assets/images/8.svg"),
    asset!("/assets/images/9.svg"),
    asset!("/assets/images/10.svg"),
];

pub fn home_icon() -> String {
    HOME_ICON.to_string()
}

pub fn wink() -> String {
    WINK.to_string()
}

pub fn avatar(index: usize) -> String {
    AVATARS[avatar_slot(index)].to_string()
}

/// Neighbors past the last avatar reuse them from 1, the user keeps 0.
fn avatar_slot(index: usize) -> usize {
    match index {
        0 => 0,
        i => (i - 1) % (AVATARS.len() - 1) + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_slots_wrap_past_ten() {
        assert_eq!(avatar_slot(0), 0);
        assert_eq!(avatar_slot(1), 1);
        assert_eq!(avatar_slot(10), 10);
        assert_eq!(avatar_slot(11), 1);
        assert_eq!(avatar_slot(25), 5);
    }
}
