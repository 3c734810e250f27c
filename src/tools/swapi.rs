//! Star Wars lookups against the SWAPI mirror.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mcp::handler::{
    error_result, get_optional_int_arg, get_optional_string_arg, get_string_arg,
    success_result, ToolHandler,
};
use crate::mcp::protocol::{Tool, ToolResult};

const SWAPI_BASE: &str = "https://swapi.info/api";

const RESOURCES: &[&str] = &[
    "films",
    "people",
    "planets",
    "species",
    "starships",
    "vehicles",
];

/// RFC 3986 unreserved characters stay literal in the search query.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Fields rendered per entry in a list response, with their labels.
const LIST_FIELDS: &[(&str, &str)] = &[
    ("episode_id", "Episode: "),
    ("birth_year", "Birth Year: "),
    ("climate", "Climate: "),
    ("model", "Model: "),
    ("classification", "Classification: "),
];

/// Fields rendered for a single entry, with label and unit suffix.
const SINGLE_FIELDS: &[(&str, &str, &str)] = &[
    ("episode_id", "Episode: ", ""),
    ("director", "Director: ", ""),
    ("release_date", "Release Date: ", ""),
    ("birth_year", "Birth Year: ", ""),
    ("height", "Height: ", "cm"),
    ("mass", "Mass: ", "kg"),
    ("hair_color", "Hair Color: ", ""),
    ("eye_color", "Eye Color: ", ""),
    ("gender", "Gender: ", ""),
    ("diameter", "Diameter: ", "km"),
    ("climate", "Climate: ", ""),
    ("terrain", "Terrain: ", ""),
    ("population", "Population: ", ""),
    ("model", "Model: ", ""),
    ("manufacturer", "Manufacturer: ", ""),
    ("cost_in_credits", "Cost: ", " credits"),
    ("length", "Length: ", "m"),
    ("crew", "Crew: ", ""),
    ("passengers", "Passengers: ", ""),
    ("classification", "Classification: ", ""),
    ("designation", "Designation: ", ""),
    ("average_height", "Average Height: ", "cm"),
    ("language", "Language: ", ""),
];

/// Star Wars information tool backed by SWAPI.
pub struct StarWarsInfoTool {
    client: Client,
}

impl StarWarsInfoTool {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("Unknown");
            return Err(Error::api(status.as_u16(), status_text, "request failed"));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ToolHandler for StarWarsInfoTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "star-wars-info".to_string(),
            description: "Get information about Star Wars films, characters, planets, starships, vehicles, and species from SWAPI".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "resource": {
                        "type": "string",
                        "enum": ["films", "people", "planets", "species", "starships", "vehicles"],
                        "description": "Type of Star Wars resource to query. Required."
                    },
                    "id": {
                        "type": "number",
                        "description": "Specific integer ID to get individual resource (omit to get all)"
                    },
                    "search": {
                        "type": "string",
                        "description": "Search term to filter results by name"
                    }
                },
                "required": ["resource"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let resource = get_string_arg(&args, "resource")?;
        if !RESOURCES.contains(&resource.as_str()) {
            return Err(Error::InvalidToolArguments(format!(
                "Unknown resource type: {}",
                resource
            )));
        }

        let id = get_optional_int_arg(&args, "id");
        let search = get_optional_string_arg(&args, "search");
        let url = build_url(&resource, id, search.as_deref());

        // Upstream failures are reported in-band, not as protocol errors.
        match self.fetch_json(&url).await {
            Ok(data) => Ok(success_result(format_response(&resource, &data))),
            Err(e) => {
                let message = match &e {
                    Error::Api {
                        status,
                        status_text,
                        ..
                    } => format!("HTTP {}: {}", status, status_text),
                    other => other.to_string(),
                };
                Ok(error_result(format!(
                    "Error fetching Star Wars data: {}",
                    message
                )))
            }
        }
    }
}

fn build_url(resource: &str, id: Option<i64>, search: Option<&str>) -> String {
    let mut url = format!("{}/{}", SWAPI_BASE, resource);

    if let Some(id) = id {
        url.push_str(&format!("/{}", id));
    } else if let Some(search) = search {
        url.push_str(&format!(
            "?search={}",
            utf8_percent_encode(search, QUERY_ENCODE)
        ));
    }

    url
}

fn format_response(resource: &str, data: &Value) -> String {
    match data.get("results").and_then(Value::as_array) {
        Some(results) => format_list(resource, data, results),
        None => format_single(resource, data),
    }
}

fn format_list(resource: &str, data: &Value, results: &[Value]) -> String {
    let count = data
        .get("count")
        .and_then(Value::as_u64)
        .unwrap_or(results.len() as u64);

    let mut out = format!("Found {} StarWars results for {}:\n\n", count, resource);

    for (index, item) in results.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", index + 1, display_name(item)));
        for (key, label) in LIST_FIELDS {
            if let Some(value) = field(item, key) {
                out.push_str(&format!("   {}{}\n", label, value));
            }
        }
        out.push('\n');
    }

    out
}

fn format_single(resource: &str, data: &Value) -> String {
    let mut out = format!("{} Information:\n\n", capitalize(resource));
    out.push_str(&format!("Name: {}\n", display_name(data)));

    for (key, label, suffix) in SINGLE_FIELDS {
        if let Some(value) = field(data, key) {
            out.push_str(&format!("{}{}{}\n", label, value, suffix));
        }
    }

    if let Some(crawl) = field(data, "opening_crawl") {
        out.push_str(&format!("\nOpening Crawl:\n{}\n", crawl));
    }

    out
}

/// People, planets, starships carry `name`; films carry `title`.
fn display_name(data: &Value) -> String {
    field(data, "name")
        .or_else(|| field(data, "title"))
        .unwrap_or_else(|| "Unknown".to_string())
}

/// A printable field value. Empty strings count as absent, like the upstream
/// payloads where unknown attributes are blank.
fn field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
