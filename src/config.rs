use crate::view::ViewSettings;
use std::env;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Match cell requirements against versioned target ids.
    pub versioned_value_mappings: bool,
    /// Security attributes shown as portfolio grid columns.
    pub blotter_attributes: Vec<String>,
    /// Maximum viewports per grid of a view.
    pub max_viewports_per_grid: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3002);

        // Format: "SecurityType,Name,Currency"; empty drops the column group
        let blotter_attributes = env::var("BLOTTER_ATTRIBUTES")
            .map(|v| parse_list(&v))
            .unwrap_or_else(|_| vec!["SecurityType".to_string(), "Name".to_string()]);

        Self {
            host,
            port,
            versioned_value_mappings: env::var("VERSIONED_VALUE_MAPPINGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            blotter_attributes,
            max_viewports_per_grid: env::var("MAX_VIEWPORTS_PER_GRID")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|max| *max > 0)
                .unwrap_or(64),
        }
    }

    /// Options every new view is created with.
    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            versioned_mappings: self.versioned_value_mappings,
            blotter_attributes: self.blotter_attributes.clone(),
            max_viewports_per_grid: self.max_viewports_per_grid,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_flag(value: &str) -> bool {
    value == "true" || value == "1"
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list("SecurityType, Name,,Currency "),
            vec!["SecurityType", "Name", "Currency"]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("yes"));
    }

    #[test]
    fn test_view_settings_follow_config() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 3002,
            versioned_value_mappings: true,
            blotter_attributes: vec!["Name".to_string()],
            max_viewports_per_grid: 8,
        };
        let settings = config.view_settings();
        assert!(settings.versioned_mappings);
        assert_eq!(settings.blotter_attributes, vec!["Name".to_string()]);
        assert_eq!(settings.max_viewports_per_grid, 8);
    }
}
