//! MCP Prompt Templates
//!
//! Pre-defined prompts with argument completion for common tasks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// A prompt argument definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// A prompt definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// A prompt message (the actual content).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: PromptContent,
}

/// Prompt content types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum PromptContent {
    Text {
        text: String,
    },
    Resource {
        uri: String,
        mime_type: Option<String>,
    },
}

/// Result of prompts/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Result of prompts/get.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// Renders a prompt from resolved arguments.
pub type RenderFn = fn(&HashMap<String, String>) -> Vec<PromptMessage>;

/// Produces completion candidates for one argument. The second parameter
/// carries arguments the client has already resolved.
pub type CompleteFn = fn(&str, &HashMap<String, String>) -> Vec<String>;

struct RegisteredPrompt {
    prompt: Prompt,
    render: RenderFn,
    completions: HashMap<String, CompleteFn>,
}

/// Prompt registry.
pub struct PromptRegistry {
    prompts: HashMap<String, RegisteredPrompt>,
}

impl PromptRegistry {
    /// Create a new registry with built-in prompts.
    pub fn new() -> Self {
        let mut registry = Self {
            prompts: HashMap::new(),
        };
        registry.register_builtin_prompts();
        registry
    }

    /// Register built-in prompts.
    fn register_builtin_prompts(&mut self) {
        self.register(
            Prompt {
                name: "review-code".to_string(),
                description: "Review code for best practices and potential issues".to_string(),
                arguments: vec![PromptArgument {
                    name: "code".to_string(),
                    description: "The code to review".to_string(),
                    required: true,
                }],
            },
            render_review_code,
        );

        self.register_with_completions(
            Prompt {
                name: "code-review".to_string(),
                description: "Generate comprehensive code review feedback".to_string(),
                arguments: vec![
                    PromptArgument {
                        name: "language".to_string(),
                        description: "Programming language of the code".to_string(),
                        required: true,
                    },
                    PromptArgument {
                        name: "reviewType".to_string(),
                        description: "Review focus: security, performance, style, or logic"
                            .to_string(),
                        required: true,
                    },
                    PromptArgument {
                        name: "code".to_string(),
                        description: "Code to review".to_string(),
                        required: true,
                    },
                ],
            },
            render_code_review,
            &[
                ("language", complete_language as CompleteFn),
                ("reviewType", complete_review_type as CompleteFn),
            ],
        );

        self.register_with_completions(
            Prompt {
                name: "team-standup".to_string(),
                description: "Generate standup meeting prompts for different teams".to_string(),
                arguments: vec![
                    PromptArgument {
                        name: "department".to_string(),
                        description: "Team department".to_string(),
                        required: true,
                    },
                    PromptArgument {
                        name: "teamMember".to_string(),
                        description: "Team member to address".to_string(),
                        required: true,
                    },
                    PromptArgument {
                        name: "sprintGoal".to_string(),
                        description: "Current sprint goal".to_string(),
                        required: true,
                    },
                ],
            },
            render_team_standup,
            &[
                ("department", complete_department as CompleteFn),
                ("teamMember", complete_team_member as CompleteFn),
            ],
        );
    }

    /// Register a prompt without completions.
    pub fn register(&mut self, prompt: Prompt, render: RenderFn) {
        self.prompts.insert(
            prompt.name.clone(),
            RegisteredPrompt {
                prompt,
                render,
                completions: HashMap::new(),
            },
        );
    }

    /// Register a prompt with per-argument completion functions.
    pub fn register_with_completions(
        &mut self,
        prompt: Prompt,
        render: RenderFn,
        completions: &[(&str, CompleteFn)],
    ) {
        self.prompts.insert(
            prompt.name.clone(),
            RegisteredPrompt {
                prompt,
                render,
                completions: completions
                    .iter()
                    .map(|(name, f)| (name.to_string(), *f))
                    .collect(),
            },
        );
    }

    /// List all prompts.
    pub fn list(&self) -> Vec<Prompt> {
        self.prompts.values().map(|r| r.prompt.clone()).collect()
    }

    /// Render a prompt by name, checking required arguments first.
    pub fn get(&self, name: &str, arguments: &HashMap<String, String>) -> Result<GetPromptResult> {
        let registered = self
            .prompts
            .get(name)
            .ok_or_else(|| Error::PromptNotFound(name.to_string()))?;

        for arg in &registered.prompt.arguments {
            if arg.required && !arguments.contains_key(&arg.name) {
                return Err(Error::MissingPromptArgument(arg.name.clone()));
            }
        }

        Ok(GetPromptResult {
            description: Some(registered.prompt.description.clone()),
            messages: (registered.render)(arguments),
        })
    }

    /// Complete a prompt argument, passing already-resolved arguments through.
    pub fn complete(
        &self,
        prompt: &str,
        argument: &str,
        value: &str,
        context: &HashMap<String, String>,
    ) -> Option<Vec<String>> {
        self.prompts
            .get(prompt)?
            .completions
            .get(argument)
            .map(|f| f(value, context))
    }

    /// Number of registered prompts.
    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ===== Built-in Renderers =====

fn user_text(text: String) -> Vec<PromptMessage> {
    vec![PromptMessage {
        role: "user".to_string(),
        content: PromptContent::Text { text },
    }]
}

fn render_review_code(args: &HashMap<String, String>) -> Vec<PromptMessage> {
    let code = args.get("code").map(String::as_str).unwrap_or_default();
    user_text(format!("Please review this code:\n\n{}", code))
}

fn render_code_review(args: &HashMap<String, String>) -> Vec<PromptMessage> {
    let language = args.get("language").map(String::as_str).unwrap_or_default();
    let review_type = args
        .get("reviewType")
        .map(String::as_str)
        .unwrap_or_default();
    let code = args.get("code").map(String::as_str).unwrap_or_default();

    user_text(format!(
        "Please provide a {review_type} review for this {language} code:\n\n\
         ```{language}\n{code}\n```\n\n\
         Focus on:\n\
         - {review_type} best practices\n\
         - Potential improvements\n\
         - Specific recommendations\n\
         - Code quality metrics"
    ))
}

fn render_team_standup(args: &HashMap<String, String>) -> Vec<PromptMessage> {
    let department = args
        .get("department")
        .map(String::as_str)
        .unwrap_or_default();
    let team_member = args
        .get("teamMember")
        .map(String::as_str)
        .unwrap_or_default();
    let sprint_goal = args
        .get("sprintGoal")
        .map(String::as_str)
        .unwrap_or_default();

    let focus_areas = match department {
        "engineering" => "- Code reviews, technical debt, architecture decisions",
        "design" => "- User research, design systems, prototypes",
        "product" => "- Feature specifications, user feedback, roadmap planning",
        "marketing" => "- Campaign performance, content creation, lead generation",
        _ => "- Pipeline updates, customer meetings, deal progress",
    };

    vec![PromptMessage {
        role: "assistant".to_string(),
        content: PromptContent::Text {
            text: format!(
                "Good morning {team_member}! Let's start our {department} team standup.\n\n\
                 Sprint Goal: \"{sprint_goal}\"\n\n\
                 Please share:\n\
                 1. What did you accomplish yesterday?\n\
                 2. What are you working on today?\n\
                 3. Any blockers or concerns?\n\
                 4. How does your work align with our sprint goal?\n\n\
                 Focus areas for {department}:\n{focus_areas}"
            ),
        },
    }]
}

// ===== Built-in Completions =====

fn complete_language(value: &str, _context: &HashMap<String, String>) -> Vec<String> {
    let needle = value.to_lowercase();
    ["typescript", "javascript", "python", "java", "go", "rust"]
        .iter()
        .filter(|lang| lang.starts_with(&needle))
        .map(|lang| lang.to_string())
        .collect()
}

fn complete_review_type(value: &str, _context: &HashMap<String, String>) -> Vec<String> {
    let needle = value.to_lowercase();
    ["security", "performance", "style", "logic"]
        .iter()
        .filter(|t| t.starts_with(&needle))
        .map(|t| t.to_string())
        .collect()
}

fn complete_department(value: &str, _context: &HashMap<String, String>) -> Vec<String> {
    let needle = value.to_lowercase();
    ["engineering", "design", "product", "marketing", "sales"]
        .iter()
        .filter(|dept| dept.starts_with(&needle))
        .map(|dept| dept.to_string())
        .collect()
}

fn complete_team_member(value: &str, context: &HashMap<String, String>) -> Vec<String> {
    let members: &[&str] = match context.get("department").map(String::as_str) {
        Some("engineering") => &["Alice", "Bob", "Charlie", "Diana"],
        Some("design") => &["Eva", "Frank", "Grace"],
        Some("product") => &["Henry", "Iris", "Jack"],
        Some("marketing") => &["Kate", "Liam", "Maya"],
        Some("sales") => &["Nathan", "Olivia", "Paul"],
        _ => &["Guest"],
    };

    let needle = value.to_lowercase();
    members
        .iter()
        .filter(|name| name.to_lowercase().starts_with(&needle))
        .map(|name| name.to_string())
        .collect()
}
