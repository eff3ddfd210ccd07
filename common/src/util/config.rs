use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub global_routing: GlobalRoutingConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalRoutingConfig {
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    #[serde(default = "default_true")]
    pub stage2: bool,
    #[serde(default)]
    pub stage3: bool,
    #[serde(default = "default_min_routing_layer")]
    pub min_routing_layer: usize,
    #[serde(default = "default_max_detour_ratio")]
    pub max_detour_ratio: f64,
    #[serde(default = "default_target_detour_count")]
    pub target_detour_count: i32,
    /// Logistic slope used when an edge has (almost) no capacity.
    #[serde(default = "default_cost_logistic_slope_steep")]
    pub cost_logistic_slope_steep: f64,
    #[serde(default = "default_cost_logistic_slope")]
    pub cost_logistic_slope: f64,
    #[serde(default = "default_unit_via_demand")]
    pub unit_via_demand: f64,
    /// Overflow tolerance that sends a net from stage 1 into stage 2.
    #[serde(default)]
    pub stage2_overflow_threshold: f64,
    /// Overflow tolerance that sends a net into stage 3, also used for the
    /// final report.
    #[serde(default = "default_stage3_overflow_threshold")]
    pub stage3_overflow_threshold: f64,
    #[serde(default = "default_sparse_grid_interval")]
    pub sparse_grid_interval: i32,
}

impl Default for GlobalRoutingConfig {
    fn default() -> Self {
        Self {
            num_threads: default_num_threads(),
            stage2: true,
            stage3: false,
            min_routing_layer: default_min_routing_layer(),
            max_detour_ratio: default_max_detour_ratio(),
            target_detour_count: default_target_detour_count(),
            cost_logistic_slope_steep: default_cost_logistic_slope_steep(),
            cost_logistic_slope: default_cost_logistic_slope(),
            unit_via_demand: default_unit_via_demand(),
            stage2_overflow_threshold: 0.0,
            stage3_overflow_threshold: default_stage3_overflow_threshold(),
            sparse_grid_interval: default_sparse_grid_interval(),
        }
    }
}

impl Config {
    /// Rejects values the router cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        self.global_routing.validate()
    }
}

impl GlobalRoutingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.num_threads == 0 {
            return Err("num_threads must be at least 1".to_string());
        }
        if self.target_detour_count < 1 {
            return Err(format!(
                "target_detour_count must be at least 1, got {}",
                self.target_detour_count
            ));
        }
        if self.max_detour_ratio.is_nan() || self.max_detour_ratio < 0.0 {
            return Err(format!(
                "max_detour_ratio must be non-negative, got {}",
                self.max_detour_ratio
            ));
        }
        if self.sparse_grid_interval < 1 {
            return Err(format!(
                "sparse_grid_interval must be at least 1, got {}",
                self.sparse_grid_interval
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct InputConfig {
    #[serde(default)]
    pub cap_file: Option<String>,
    #[serde(default)]
    pub net_file: Option<String>,
    #[serde(default)]
    pub output_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GuideUnits {
    /// Raw grid indices.
    Grid,
    /// `index * guide_pitch + guide_offset`.
    #[default]
    Pitch,
    /// Prefix sums of the edge lengths from the capacity file.
    Absolute,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub guide_units: GuideUnits,
    #[serde(default = "default_guide_pitch")]
    pub guide_pitch: i64,
    #[serde(default = "default_guide_offset")]
    pub guide_offset: i64,
    #[serde(default = "default_layer_prefix")]
    pub layer_prefix: String,
    #[serde(default)]
    pub heatmap_file: Option<String>,
    #[serde(default)]
    pub capacity_file: Option<String>,
    #[serde(default)]
    pub congestion_image: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            guide_units: GuideUnits::default(),
            guide_pitch: default_guide_pitch(),
            guide_offset: default_guide_offset(),
            layer_prefix: default_layer_prefix(),
            heatmap_file: None,
            capacity_file: None,
            congestion_image: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_num_threads() -> usize {
    8
}

fn default_min_routing_layer() -> usize {
    1
}

fn default_max_detour_ratio() -> f64 {
    0.1
}

fn default_target_detour_count() -> i32 {
    10
}

fn default_cost_logistic_slope_steep() -> f64 {
    1.5
}

fn default_cost_logistic_slope() -> f64 {
    0.5
}

fn default_unit_via_demand() -> f64 {
    0.5
}

fn default_stage3_overflow_threshold() -> f64 {
    2.0
}

fn default_sparse_grid_interval() -> i32 {
    10
}

fn default_guide_pitch() -> i64 {
    4200
}

fn default_guide_offset() -> i64 {
    2100
}

fn default_layer_prefix() -> String {
    "metal".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.global_routing.num_threads, 8);
        assert!(config.global_routing.stage2);
        assert!(!config.global_routing.stage3);
        assert_eq!(config.global_routing.min_routing_layer, 1);
        assert_eq!(config.output.guide_units, GuideUnits::Pitch);
        assert_eq!(config.output.guide_pitch, 4200);
        assert!(config.input.cap_file.is_none());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_detour_count_is_rejected() {
        let text = "[global_routing]\ntarget_detour_count = 0\n";
        let config: Config = toml::from_str(text).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("target_detour_count"), "{}", err);

        let config = GlobalRoutingConfig {
            sparse_grid_interval: 0,
            ..GlobalRoutingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_sections_override_selected_keys() {
        let text = r#"
            [global_routing]
            num_threads = 2
            stage3 = true

            [output]
            guide_units = "absolute"
            heatmap_file = "out/heatmap.txt"
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.global_routing.num_threads, 2);
        assert!(config.global_routing.stage3);
        assert_eq!(config.global_routing.max_detour_ratio, 0.1);
        assert_eq!(config.output.guide_units, GuideUnits::Absolute);
        assert_eq!(config.output.heatmap_file.as_deref(), Some("out/heatmap.txt"));
    }
}
