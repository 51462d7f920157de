// ── Path resolution ──
//
// logical name + index vars -> ordered physical candidates:
//   vendor overrides (detected dialect only) -> detected template -> other
//   dialect template. Candidates with an unfilled placeholder are dropped.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use super::detect::{Detection, Dialect, detect};
use super::table::{self, PathTemplate};
use crate::error::CoreError;
use crate::model::DeviceTree;

/// Values substituted into `{name}` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexVars(BTreeMap<String, String>);

impl IndexVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.0.insert(name.into(), value.to_string());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl fmt::Display) {
        self.0.insert(name.into(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substitute every placeholder, or `None` if one has no value.
    pub fn substitute(&self, template: &str) -> Option<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let close = rest[open..].find('}')? + open;
            out.push_str(&rest[..open]);
            out.push_str(self.get(&rest[open + 1..close])?);
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        Some(out)
    }

    /// Substitute known placeholders, leaving unknown ones intact.
    fn substitute_partial(&self, template: &str) -> String {
        self.0.iter().fold(template.to_owned(), |acc, (k, v)| {
            acc.replace(&format!("{{{k}}}"), v)
        })
    }
}

/// Both dialects' physical paths for a logical name, regardless of any
/// device. Placeholders without a value are left in place.
pub fn resolve_pair(logical: &str, vars: &IndexVars) -> Result<(String, String), CoreError> {
    let template = table::lookup(logical).ok_or_else(|| CoreError::UnknownLogicalPath {
        name: logical.to_owned(),
    })?;
    Ok((
        vars.substitute_partial(template.tr098),
        vars.substitute_partial(template.tr181),
    ))
}

/// Resolver bound to one device tree. Detection runs once per tree.
#[derive(Debug, Clone)]
pub struct PathResolver {
    detection: Detection,
    manufacturer: Option<String>,
}

impl PathResolver {
    pub fn new(tree: &DeviceTree) -> Self {
        Self {
            detection: detect(tree),
            manufacturer: tree.manufacturer(),
        }
    }

    pub fn detection(&self) -> Detection {
        self.detection
    }

    pub fn dialect(&self) -> Dialect {
        self.detection.dialect
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref()
    }

    /// Ordered, de-duplicated physical candidates for reading `logical`.
    /// Unknown names resolve to nothing.
    pub fn resolve(&self, logical: &str, vars: &IndexVars) -> Vec<String> {
        let Some(template) = table::lookup(logical) else {
            debug!(logical, "unknown logical path");
            return Vec::new();
        };
        let dialect = self.dialect();

        let templates = self
            .override_templates(logical)
            .chain([
                template.for_dialect(dialect),
                template.for_dialect(dialect.other()),
            ]);

        let mut candidates: Vec<String> = Vec::new();
        for t in templates {
            match vars.substitute(t) {
                Some(path) if !candidates.contains(&path) => candidates.push(path),
                Some(_) => {}
                None => debug!(logical, template = t, "dropping candidate with unfilled placeholder"),
            }
        }
        candidates
    }

    /// The single path a write to `logical` targets: the first vendor
    /// override, else the detected dialect's template. The other dialect is
    /// never written to.
    pub fn resolve_write(&self, logical: &str, vars: &IndexVars) -> Result<String, CoreError> {
        let template: &PathTemplate =
            table::lookup(logical).ok_or_else(|| CoreError::UnknownLogicalPath {
                name: logical.to_owned(),
            })?;
        self.override_templates(logical)
            .chain([template.for_dialect(self.dialect())])
            .find_map(|t| vars.substitute(t))
            .ok_or_else(|| CoreError::UnsupportedSetting {
                logical: logical.to_owned(),
                dialect: self.dialect(),
            })
    }

    fn override_templates<'a>(&'a self, logical: &'a str) -> impl Iterator<Item = &'static str> + 'a {
        table::overrides_for(logical, self.dialect(), self.manufacturer()).map(|o| o.template)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tplink_tr098() -> DeviceTree {
        DeviceTree::from_json(&json!({
            "_deviceId": { "_Manufacturer": "TP-Link", "_SerialNumber": "TP1" },
            "InternetGatewayDevice": { "DeviceInfo": { "UpTime": { "_value": 5 } } }
        }))
    }

    #[test]
    fn pair_is_complete_for_every_logical_name() {
        let vars = IndexVars::new().with("ssid", 1).with("radio", 1).with("idx", 1);
        for p in table::PATHS {
            let (a, b) = resolve_pair(p.logical, &vars).unwrap();
            assert!(!a.is_empty() && !b.is_empty(), "{}", p.logical);
            assert!(!a.contains('{') && !b.contains('{'), "{}", p.logical);

            // Without vars every declared placeholder is still visible.
            let (raw_a, raw_b) = resolve_pair(p.logical, &IndexVars::new()).unwrap();
            for name in table::placeholders(p.tr098) {
                assert!(raw_a.contains(&format!("{{{name}}}")));
            }
            for name in table::placeholders(p.tr181) {
                assert!(raw_b.contains(&format!("{{{name}}}")));
            }
        }
    }

    #[test]
    fn pair_rejects_unknown_names() {
        assert!(matches!(
            resolve_pair("wifi.nope", &IndexVars::new()),
            Err(CoreError::UnknownLogicalPath { .. })
        ));
    }

    #[test]
    fn candidates_prefer_overrides_then_dialects() {
        let resolver = PathResolver::new(&tplink_tr098());
        let paths = resolver.resolve("wifi.security.password", &IndexVars::new().with("ssid", 2));
        assert_eq!(
            paths,
            vec![
                "InternetGatewayDevice.LANDevice.1.WLANConfiguration.2.PreSharedKey.1.PreSharedKey",
                "InternetGatewayDevice.LANDevice.1.WLANConfiguration.2.KeyPassphrase",
                "InternetGatewayDevice.LANDevice.1.WLANConfiguration.2.X_TP_PreSharedKey",
                "Device.WiFi.AccessPoint.2.Security.KeyPassphrase",
            ]
        );
    }

    #[test]
    fn unhyphenated_vendor_name_gets_overrides() {
        let tree = DeviceTree::from_json(&json!({
            "_deviceId": { "_Manufacturer": "TPLINK", "_SerialNumber": "TP2" },
            "InternetGatewayDevice": { "DeviceInfo": { "UpTime": { "_value": 5 } } }
        }));
        let resolver = PathResolver::new(&tree);
        assert_eq!(
            resolver
                .resolve_write("wifi.security.password", &IndexVars::new().with("ssid", 1))
                .unwrap(),
            "InternetGatewayDevice.LANDevice.1.WLANConfiguration.1.PreSharedKey.1.PreSharedKey"
        );
    }

    #[test]
    fn unfilled_placeholder_drops_candidate() {
        let resolver = PathResolver::new(&tplink_tr098());
        assert!(resolver.resolve("wifi.ssid", &IndexVars::new()).is_empty());
        assert!(resolver.resolve("unknown.name", &IndexVars::new()).is_empty());
        assert_eq!(
            resolver.resolve("device.uptime", &IndexVars::new()),
            vec![
                "InternetGatewayDevice.DeviceInfo.UpTime",
                "Device.DeviceInfo.UpTime"
            ]
        );
    }

    #[test]
    fn write_target_uses_first_override_or_dialect() {
        let resolver = PathResolver::new(&tplink_tr098());
        let vars = IndexVars::new().with("ssid", 1);
        assert_eq!(
            resolver.resolve_write("wifi.security.password", &vars).unwrap(),
            "InternetGatewayDevice.LANDevice.1.WLANConfiguration.1.PreSharedKey.1.PreSharedKey"
        );
        assert_eq!(
            resolver.resolve_write("wan.ppp.username", &vars).unwrap(),
            "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.Username"
        );
        assert!(matches!(
            resolver.resolve_write("wifi.ssid", &IndexVars::new()),
            Err(CoreError::UnsupportedSetting {
                dialect: Dialect::Tr098,
                ..
            })
        ));
    }

    #[test]
    fn substitute_handles_multiple_and_missing_vars() {
        let vars = IndexVars::new().with("a", 1).with("b", "x");
        assert_eq!(vars.substitute("p.{a}.q.{b}").as_deref(), Some("p.1.q.x"));
        assert_eq!(vars.substitute("p.{c}"), None);
        assert_eq!(vars.substitute("p.{a"), None);
    }
}
