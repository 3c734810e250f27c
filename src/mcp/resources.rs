//! MCP Resources Support
//!
//! Static resources and URI templates with per-parameter completion.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// A resource exposed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A parameterized resource template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub uri_template: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Resource contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>, // base64 encoded
}

/// Result of resources/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Result of resources/templates/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourceTemplatesResult {
    pub resource_templates: Vec<ResourceTemplate>,
}

/// Result of resources/read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

/// How a registered resource is addressed.
#[derive(Debug, Clone)]
pub enum ResourceDef {
    Static(Resource),
    Template(ResourceTemplate),
}

/// Produces contents for a matched URI. Template parameters arrive decoded.
pub type ReadFn = fn(&str, &HashMap<String, String>) -> Result<Vec<ResourceContents>>;

/// Produces completion candidates for one template parameter.
pub type CompleteFn = fn(&str) -> Vec<String>;

struct RegisteredResource {
    def: ResourceDef,
    read: ReadFn,
    completions: HashMap<String, CompleteFn>,
}

/// Resource registry.
pub struct ResourceRegistry {
    resources: Vec<RegisteredResource>,
}

impl ResourceRegistry {
    /// Create a new registry with built-in resources.
    pub fn new() -> Self {
        let mut registry = Self {
            resources: Vec::new(),
        };
        registry.register_builtin_resources();
        registry
    }

    /// Register built-in resources.
    fn register_builtin_resources(&mut self) {
        self.register(
            ResourceDef::Template(ResourceTemplate {
                uri_template: "greeting://{name}".to_string(),
                name: "greeting".to_string(),
                description: Some("Dynamic greeting generator".to_string()),
                mime_type: None,
            }),
            read_greeting,
        );

        self.register_with_completions(
            ResourceDef::Template(ResourceTemplate {
                uri_template: "users://{userId}/profile".to_string(),
                name: "user-profile".to_string(),
                description: Some("Get user profile information".to_string()),
                mime_type: Some("application/json".to_string()),
            }),
            read_user_profile,
            &[("userId", complete_user_id as CompleteFn)],
        );

        self.register(
            ResourceDef::Static(Resource {
                uri: "config://app/settings".to_string(),
                name: "app-config".to_string(),
                description: Some("Current application settings".to_string()),
                mime_type: Some("application/json".to_string()),
            }),
            read_app_config,
        );
    }

    /// Register a resource without completions.
    pub fn register(&mut self, def: ResourceDef, read: ReadFn) {
        self.resources.push(RegisteredResource {
            def,
            read,
            completions: HashMap::new(),
        });
    }

    /// Register a resource with per-parameter completion functions.
    pub fn register_with_completions(
        &mut self,
        def: ResourceDef,
        read: ReadFn,
        completions: &[(&str, CompleteFn)],
    ) {
        self.resources.push(RegisteredResource {
            def,
            read,
            completions: completions
                .iter()
                .map(|(name, f)| (name.to_string(), *f))
                .collect(),
        });
    }

    /// List static resources.
    pub fn list(&self) -> ListResourcesResult {
        let resources = self
            .resources
            .iter()
            .filter_map(|r| match &r.def {
                ResourceDef::Static(res) => Some(res.clone()),
                ResourceDef::Template(_) => None,
            })
            .collect();

        ListResourcesResult {
            resources,
            next_cursor: None,
        }
    }

    /// List resource templates.
    pub fn list_templates(&self) -> ListResourceTemplatesResult {
        let resource_templates = self
            .resources
            .iter()
            .filter_map(|r| match &r.def {
                ResourceDef::Template(t) => Some(t.clone()),
                ResourceDef::Static(_) => None,
            })
            .collect();

        ListResourceTemplatesResult { resource_templates }
    }

    /// Read a resource by URI, matching templates where needed.
    pub fn read(&self, uri: &str) -> Result<ReadResourceResult> {
        for registered in &self.resources {
            match &registered.def {
                ResourceDef::Static(res) if res.uri == uri => {
                    let contents = (registered.read)(uri, &HashMap::new())?;
                    return Ok(ReadResourceResult { contents });
                }
                ResourceDef::Template(t) => {
                    if let Some(params) = match_uri_template(&t.uri_template, uri) {
                        let contents = (registered.read)(uri, &params)?;
                        return Ok(ReadResourceResult { contents });
                    }
                }
                _ => {}
            }
        }

        Err(Error::ResourceNotFound(uri.to_string()))
    }

    /// Complete a template parameter. `template` is the registered URI template.
    pub fn complete(&self, template: &str, argument: &str, value: &str) -> Option<Vec<String>> {
        self.resources.iter().find_map(|r| match &r.def {
            ResourceDef::Template(t) if t.uri_template == template => {
                r.completions.get(argument).map(|f| f(value))
            }
            _ => None,
        })
    }

    /// Number of registered resources and templates.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Match a URI against a `{param}` template, extracting decoded parameters.
///
/// Each parameter captures up to the next literal character in the template,
/// or to the end of the URI for a trailing parameter. Empty captures fail the
/// match.
fn match_uri_template(template: &str, uri: &str) -> Option<HashMap<String, String>> {
    let mut params = HashMap::new();
    let mut remaining_template = template;
    let mut remaining_uri = uri;

    while let Some(open) = remaining_template.find('{') {
        let (literal, rest) = remaining_template.split_at(open);
        remaining_uri = remaining_uri.strip_prefix(literal)?;

        let close = rest.find('}')?;
        let param = &rest[1..close];
        remaining_template = &rest[close + 1..];

        let captured = match remaining_template.chars().next() {
            Some(delimiter) => {
                let end = remaining_uri.find(delimiter)?;
                let (value, tail) = remaining_uri.split_at(end);
                remaining_uri = tail;
                value
            }
            None => {
                let value = remaining_uri;
                remaining_uri = "";
                value
            }
        };

        if captured.is_empty() {
            return None;
        }

        let decoded = percent_decode_str(captured).decode_utf8_lossy().to_string();
        params.insert(param.to_string(), decoded);
    }

    if remaining_uri == remaining_template {
        Some(params)
    } else {
        None
    }
}

// ===== Built-in Readers =====

fn read_greeting(uri: &str, params: &HashMap<String, String>) -> Result<Vec<ResourceContents>> {
    let name = params
        .get("name")
        .ok_or_else(|| Error::ResourceNotFound(uri.to_string()))?;

    Ok(vec![ResourceContents {
        uri: uri.to_string(),
        mime_type: None,
        text: Some(format!("Hello, {}!", name)),
        blob: None,
    }])
}

fn read_user_profile(uri: &str, params: &HashMap<String, String>) -> Result<Vec<ResourceContents>> {
    let user_id = params
        .get("userId")
        .ok_or_else(|| Error::ResourceNotFound(uri.to_string()))?;

    let profile = serde_json::json!({
        "id": user_id,
        "name": format!("User {}", user_id),
        "email": format!("{}@example.com", user_id),
        "created": chrono::Utc::now().to_rfc3339(),
    });

    Ok(vec![ResourceContents {
        uri: uri.to_string(),
        mime_type: Some("application/json".to_string()),
        text: Some(serde_json::to_string_pretty(&profile)?),
        blob: None,
    }])
}

fn read_app_config(uri: &str, _params: &HashMap<String, String>) -> Result<Vec<ResourceContents>> {
    let settings = serde_json::json!({
        "version": "1.0.0",
        "environment": "development",
        "features": ["auth", "logging", "metrics"],
    });

    Ok(vec![ResourceContents {
        uri: uri.to_string(),
        mime_type: Some("application/json".to_string()),
        text: Some(serde_json::to_string_pretty(&settings)?),
        blob: None,
    }])
}

fn complete_user_id(value: &str) -> Vec<String> {
    ["user123", "user456", "admin789"]
        .iter()
        .filter(|id| id.starts_with(value))
        .map(|id| id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_uri_template_trailing_param() {
        let params = match_uri_template("greeting://{name}", "greeting://Leia").unwrap();
        assert_eq!(params.get("name"), Some(&"Leia".to_string()));

        assert!(match_uri_template("greeting://{name}", "greeting://").is_none());
        assert!(match_uri_template("greeting://{name}", "users://Leia").is_none());
    }

    #[test]
    fn test_match_uri_template_inner_param() {
        let params =
            match_uri_template("users://{userId}/profile", "users://user123/profile").unwrap();
        assert_eq!(params.get("userId"), Some(&"user123".to_string()));

        assert!(match_uri_template("users://{userId}/profile", "users://user123").is_none());
        assert!(
            match_uri_template("users://{userId}/profile", "users://user123/settings").is_none()
        );
    }

    #[test]
    fn test_match_uri_template_decodes_percent_encoding() {
        let params = match_uri_template("greeting://{name}", "greeting://Han%20Solo").unwrap();
        assert_eq!(params.get("name"), Some(&"Han Solo".to_string()));
    }

    #[test]
    fn test_list_statics_only() {
        let registry = ResourceRegistry::new();
        let result = registry.list();

        assert_eq!(result.resources.len(), 1);
        assert_eq!(result.resources[0].uri, "config://app/settings");
    }

    #[test]
    fn test_list_templates() {
        let registry = ResourceRegistry::new();
        let result = registry.list_templates();

        let templates: Vec<_> = result
            .resource_templates
            .iter()
            .map(|t| t.uri_template.as_str())
            .collect();
        assert!(templates.contains(&"greeting://{name}"));
        assert!(templates.contains(&"users://{userId}/profile"));
    }

    #[test]
    fn test_read_greeting() {
        let registry = ResourceRegistry::new();
        let result = registry.read("greeting://Chewbacca").unwrap();

        assert_eq!(result.contents.len(), 1);
        assert_eq!(result.contents[0].text, Some("Hello, Chewbacca!".to_string()));
    }

    #[test]
    fn test_read_user_profile() {
        let registry = ResourceRegistry::new();
        let result = registry.read("users://user123/profile").unwrap();

        let text = result.contents[0].text.as_ref().unwrap();
        assert!(text.contains("\"id\": \"user123\""));
        assert!(text.contains("\"email\": \"user123@example.com\""));
        assert_eq!(
            result.contents[0].mime_type,
            Some("application/json".to_string())
        );
    }

    #[test]
    fn test_read_app_config() {
        let registry = ResourceRegistry::new();
        let result = registry.read("config://app/settings").unwrap();

        let text = result.contents[0].text.as_ref().unwrap();
        assert!(text.contains("\"version\": \"1.0.0\""));
        assert!(text.contains("\"auth\""));
    }

    #[test]
    fn test_read_unknown_uri() {
        let registry = ResourceRegistry::new();
        let err = registry.read("config://app/missing").unwrap_err();

        assert!(matches!(err, Error::ResourceNotFound(_)));
    }

    #[test]
    fn test_complete_user_id() {
        let registry = ResourceRegistry::new();

        let values = registry
            .complete("users://{userId}/profile", "userId", "user")
            .unwrap();
        assert_eq!(values, vec!["user123".to_string(), "user456".to_string()]);

        let all = registry
            .complete("users://{userId}/profile", "userId", "")
            .unwrap();
        assert_eq!(all.len(), 3);

        assert!(registry
            .complete("users://{userId}/profile", "unknown", "x")
            .is_none());
        assert!(registry.complete("greeting://{name}", "name", "x").is_none());
    }

    #[test]
    fn test_resource_serialization() {
        let resource = Resource {
            uri: "config://app/settings".to_string(),
            name: "app-config".to_string(),
            description: Some("Current application settings".to_string()),
            mime_type: Some("application/json".to_string()),
        };

        let json = serde_json::to_string(&resource).unwrap();
        assert!(json.contains("\"mimeType\":\"application/json\""));
    }

    #[test]
    fn test_template_serialization() {
        let template = ResourceTemplate {
            uri_template: "users://{userId}/profile".to_string(),
            name: "user-profile".to_string(),
            description: None,
            mime_type: None,
        };

        let json = serde_json::to_string(&template).unwrap();
        assert!(json.contains("\"uriTemplate\":\"users://{userId}/profile\""));
        assert!(!json.contains("description"));
    }

    #[test]
    fn test_resource_contents_skips_blob() {
        let contents = ResourceContents {
            uri: "greeting://Rey".to_string(),
            mime_type: None,
            text: Some("Hello, Rey!".to_string()),
            blob: None,
        };

        let json = serde_json::to_string(&contents).unwrap();
        assert!(json.contains("\"text\":\"Hello, Rey!\""));
        assert!(!json.contains("\"blob\""));
    }
}
