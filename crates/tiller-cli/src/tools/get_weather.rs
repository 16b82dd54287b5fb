//! Simulated weather tool

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;

use loop_core::{JsonMap, ParameterProperty, ParameterSchema, Tool, ToolResult};

const CONDITIONS: [&str; 5] = ["Sunny", "Cloudy", "Rainy", "Partly Cloudy", "Clear"];

/// Tool returning simulated weather, deterministic per location so repeated
/// runs replay identically.
pub struct GetWeatherTool;

#[async_trait]
impl Tool for GetWeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get current weather for a location."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .with_required("location", ParameterProperty::string("City or location name"))
    }

    async fn execute(&self, args: &JsonMap) -> Result<ToolResult> {
        let location = args
            .get("location")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: location"))?;

        let mut hasher = DefaultHasher::new();
        location.to_lowercase().hash(&mut hasher);
        let seed = hasher.finish();

        let condition = CONDITIONS[(seed % CONDITIONS.len() as u64) as usize];
        let temperature = 15 + (seed / 7 % 21) as i64;
        let humidity = 30 + (seed / 147 % 51) as i64;

        let mut data = JsonMap::new();
        data.insert("location".to_string(), json!(location));
        data.insert("temperature".to_string(), json!(temperature));
        data.insert("humidity".to_string(), json!(humidity));
        data.insert("condition".to_string(), json!(condition));

        Ok(ToolResult::success_with_data(
            format!(
                "Weather in {}: {}, {}°C, {}% humidity",
                location, condition, temperature, humidity
            ),
            data,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_weather_is_deterministic_per_location() {
        let args = json!({"location": "Tokyo"}).as_object().unwrap().clone();
        let first = GetWeatherTool.execute(&args).await.unwrap();
        let second = GetWeatherTool.execute(&args).await.unwrap();
        assert_eq!(first, second);
        assert!(first.message.starts_with("Weather in Tokyo:"));
    }

    #[tokio::test]
    async fn test_weather_values_in_range() {
        let args = json!({"location": "Reykjavik"}).as_object().unwrap().clone();
        let result = GetWeatherTool.execute(&args).await.unwrap();
        let data = result.data.unwrap();
        let temperature = data.get("temperature").unwrap().as_i64().unwrap();
        let humidity = data.get("humidity").unwrap().as_i64().unwrap();
        assert!((15..=35).contains(&temperature));
        assert!((30..=80).contains(&humidity));
    }
}
