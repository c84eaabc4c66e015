//! Asset selection strategies.
//!
//! Each update channel picks its artifact from the release's asset list with
//! one of these strategies. Selection is order-stable: the first matching
//! asset in release order wins.

use std::fmt;

use regex::Regex;

use crate::types::Asset;

#[derive(Debug, Clone)]
pub enum AssetSelector {
    /// Asset name equals the given string
    ExactName(String),
    /// Asset name matches the regex anywhere
    Pattern(Regex),
    /// Asset name contains every given substring
    ContainsAll(Vec<String>),
}

impl AssetSelector {
    pub fn exact(name: impl Into<String>) -> Self {
        AssetSelector::ExactName(name.into())
    }

    pub fn contains_all<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AssetSelector::ContainsAll(parts.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        match self {
            AssetSelector::ExactName(name) => asset.name == *name,
            AssetSelector::Pattern(re) => re.is_match(&asset.name),
            AssetSelector::ContainsAll(parts) => {
                parts.iter().all(|part| asset.name.contains(part.as_str()))
            }
        }
    }

    pub fn select<'a>(&self, assets: &'a [Asset]) -> Option<&'a Asset> {
        assets.iter().find(|asset| self.matches(asset))
    }
}

impl fmt::Display for AssetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetSelector::ExactName(name) => write!(f, "name {}", name),
            AssetSelector::Pattern(re) => write!(f, "{}", re.as_str()),
            AssetSelector::ContainsAll(parts) => write!(f, "all of [{}]", parts.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> Asset {
        Asset {
            name: name.to_string(),
            browser_download_url: format!("https://example.com/download/{}", name),
        }
    }

    fn release_assets() -> Vec<Asset> {
        vec![
            asset("MyApp-1.2.0-mac.zip"),
            asset("MyApp-1.2.0-win32-x64.zip"),
            asset("myapp_1.2.0_amd64.deb"),
            asset("myapp-1.2.0.x86_64.rpm"),
            asset("RELEASES"),
            asset("MyApp-1.2.0-full.nupkg"),
            asset("MyApp-1.2.0-win32-ia32.zip"),
        ]
    }

    #[test]
    fn exact_name_does_not_match_substrings() {
        let assets = vec![asset("RELEASES.txt"), asset("RELEASES")];
        let selected = AssetSelector::exact("RELEASES").select(&assets).unwrap();
        assert_eq!(selected.name, "RELEASES");
    }

    #[test]
    fn pattern_selects_first_match_in_order() {
        let assets = release_assets();
        let selector = AssetSelector::Pattern(Regex::new(r"-win32.*\.zip$").unwrap());
        let selected = selector.select(&assets).unwrap();
        assert_eq!(selected.name, "MyApp-1.2.0-win32-x64.zip");
    }

    #[test]
    fn contains_all_requires_every_part() {
        let assets = release_assets();
        let selected = AssetSelector::contains_all(["deb", "amd64"])
            .select(&assets)
            .unwrap();
        assert_eq!(selected.name, "myapp_1.2.0_amd64.deb");

        assert!(
            AssetSelector::contains_all(["deb", "i386"])
                .select(&assets)
                .is_none()
        );
    }

    #[test]
    fn empty_asset_list_selects_nothing() {
        assert!(AssetSelector::exact("RELEASES").select(&[]).is_none());
    }

    #[test]
    fn display_names_the_criterion() {
        let selector = AssetSelector::Pattern(Regex::new(r"-mac\.zip$").unwrap());
        assert_eq!(selector.to_string(), r"-mac\.zip$");
        assert_eq!(
            AssetSelector::contains_all(["rpm", "i386"]).to_string(),
            "all of [rpm, i386]"
        );
    }
}
