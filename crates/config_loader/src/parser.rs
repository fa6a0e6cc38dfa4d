//! 配置解析模块
//!
//! 场景文件支持 TOML 与 JSON 两种格式，只做反序列化，校验由 `validator` 负责。

use contracts::{ContractError, ScenarioBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式 (大小写不敏感)
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

fn parse_error<E>(format: ConfigFormat, e: E) -> ContractError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ContractError::ConfigParse {
        message: format!("{} parse error: {e}", format.label()),
        source: Some(Box::new(e)),
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<ScenarioBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| parse_error(ConfigFormat::Toml, e))
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<ScenarioBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| parse_error(ConfigFormat::Json, e))
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<ScenarioBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SensorType;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[[vehicles]]
id = "ego"
blueprint = "vehicle.tesla.model3"

[[vehicles.sensors]]
id = "front_camera"
sensor_type = "camera"
frequency_hz = 20.0
gbuffers = [1, 3]
enable_ros = true
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.session.host, "localhost");
        assert_eq!(bp.session.port, 2000);
        assert_eq!(bp.vehicles.len(), 1);

        let camera = &bp.vehicles[0].sensors[0];
        assert_eq!(camera.sensor_type, SensorType::Camera);
        assert!(camera.listen);
        assert_eq!(camera.gbuffers, vec![1, 3]);
        assert!(camera.enable_ros);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "session": { "host": "sim.local", "port": 2001 },
            "vehicles": [{
                "id": "ego",
                "blueprint": "vehicle.tesla.model3",
                "sensors": [{
                    "id": "lane",
                    "sensor_type": "lane_invasion",
                    "frequency_hz": 10.0,
                    "listen": false
                }]
            }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.session.port, 2001);
        assert_eq!(bp.vehicles[0].sensors[0].sensor_type, SensorType::LaneInvasion);
        assert!(!bp.vehicles[0].sensors[0].listen);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_unknown_sensor_type() {
        let content = r#"
[[vehicles]]
id = "ego"
blueprint = "vehicle.tesla.model3"

[[vehicles.sensors]]
id = "x"
sensor_type = "sonar"
frequency_hz = 1.0
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
