//! Tool registry - typed metadata, declarative parameter schemas, status table.
//!
//! Owns tool *metadata* (not implementations; handlers live in the invoker).
//! Status is the only field mutated after load, and only by health probes.

use crate::types::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

// =============================================================================
// Enumerations
// =============================================================================

/// Tool grouping shown by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Development,
    Testing,
    Research,
    Productivity,
    Custom,
}

/// Operational status of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    #[default]
    Active,
    Inactive,
    Error,
    Loading,
}

impl ToolStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolStatus::Active => "active",
            ToolStatus::Inactive => "inactive",
            ToolStatus::Error => "error",
            ToolStatus::Loading => "loading",
        }
    }
}

// =============================================================================
// Parameter schema
// =============================================================================

/// Declared type of a tool parameter. Any UI can render a form from these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    StringList,
    Enum(Vec<String>),
    Optional(Box<ParamType>),
}

impl ParamType {
    /// Check a JSON value against this type.
    pub fn validate(&self, value: &Value) -> std::result::Result<(), String> {
        let matches = match self {
            ParamType::Optional(inner) => {
                return if value.is_null() {
                    Ok(())
                } else {
                    inner.validate(value)
                };
            }
            ParamType::Enum(variants) => {
                return match value.as_str() {
                    Some(s) if variants.iter().any(|v| v == s) => Ok(()),
                    Some(s) => Err(format!(
                        "'{}' is not one of: {}",
                        s,
                        variants.join(", ")
                    )),
                    None => Err(format!("expected string, got {}", json_type(value))),
                };
            }
            ParamType::StringList => {
                let Some(items) = value.as_array() else {
                    return Err(format!("expected array, got {}", json_type(value)));
                };
                if let Some(pos) = items.iter().position(|v| !v.is_string()) {
                    return Err(format!(
                        "expected string at index {}, got {}",
                        pos,
                        json_type(&items[pos])
                    ));
                }
                true
            }
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
        };

        if matches {
            Ok(())
        } else {
            Err(format!(
                "expected {}, got {}",
                self.type_name(),
                json_type(value)
            ))
        }
    }

    /// Short type label used in validation messages and form rendering.
    pub fn type_name(&self) -> String {
        match self {
            ParamType::String => "string".to_string(),
            ParamType::Integer => "integer".to_string(),
            ParamType::Number => "number".to_string(),
            ParamType::Boolean => "boolean".to_string(),
            ParamType::StringList => "string[]".to_string(),
            ParamType::Enum(variants) => format!("enum({})", variants.join("|")),
            ParamType::Optional(inner) => format!("{}?", inner.type_name()),
        }
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One field of a tool's input form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParamDef {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            default: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self::required(name, ParamType::Optional(Box::new(param_type)), description)
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !matches!(self.param_type, ParamType::Optional(_))
    }
}

// =============================================================================
// Tool
// =============================================================================

fn default_enabled() -> bool {
    true
}

/// A named external capability invocable through the uniform request/result contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ToolCategory,
    #[serde(default)]
    pub status: ToolStatus,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Opaque tool configuration (endpoint, auth requirements, `healthUrl`).
    #[serde(default)]
    pub config: HashMap<String, Value>,
    /// Declarative input schema. Empty means parameters are passed through unchecked.
    #[serde(default)]
    pub parameters: Vec<ParamDef>,
}

impl Tool {
    pub fn new(id: &str, name: &str, category: ToolCategory) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            category,
            status: ToolStatus::Active,
            enabled: true,
            permissions: Vec::new(),
            version: None,
            author: None,
            config: HashMap::new(),
            parameters: Vec::new(),
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self.status = ToolStatus::Inactive;
        self
    }

    pub fn permission(mut self, permission: &str) -> Self {
        self.permissions.push(permission.to_string());
        self
    }

    pub fn config_value(mut self, key: &str, value: Value) -> Self {
        self.config.insert(key.to_string(), value);
        self
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        self.parameters.push(param);
        self
    }

    /// Enabled and not flagged by the last health probe.
    pub fn is_available(&self) -> bool {
        self.enabled && self.status == ToolStatus::Active
    }

    /// Explicit health endpoint override from `config.healthUrl`.
    pub fn health_url(&self) -> Option<&str> {
        self.config.get("healthUrl").and_then(|v| v.as_str())
    }
}

/// Catalog shipped with the service: the gateway-brokered tools plus the desktop.
pub fn builtin_tools() -> Vec<Tool> {
    vec![
        Tool::new("github", "GitHub", ToolCategory::Development)
            .describe("Access GitHub repositories, issues, and pull requests")
            .permission("repo:read")
            .permission("issues:read")
            .config_value("authRequired", json!(true))
            .config_value("endpoint", json!("https://api.github.com"))
            .param(ParamDef::optional("query", ParamType::String, "Search query"))
            .param(ParamDef::optional("repo", ParamType::String, "owner/name")),
        Tool::new("browserbase", "Browserbase", ToolCategory::Testing)
            .describe("Web automation and browser control")
            .permission("browser:control")
            .config_value("authRequired", json!(true))
            .config_value("endpoint", json!("https://api.browserbase.com"))
            .param(ParamDef::required("url", ParamType::String, "Page to open"))
            .param(ParamDef::optional(
                "waitFor",
                ParamType::Enum(vec![
                    "networkidle".to_string(),
                    "domcontentloaded".to_string(),
                    "load".to_string(),
                ]),
                "Load event to wait for",
            ))
            .param(
                ParamDef::optional("fullPage", ParamType::Boolean, "Capture the full page")
                    .with_default(json!(false)),
            ),
        Tool::new("exa", "Exa", ToolCategory::Research)
            .describe("AI-powered web search and content extraction")
            .permission("search:web")
            .config_value("authRequired", json!(true))
            .config_value("endpoint", json!("https://api.exa.ai"))
            .param(ParamDef::required("query", ParamType::String, "Search query"))
            .param(
                ParamDef::optional("numResults", ParamType::Integer, "Maximum results")
                    .with_default(json!(10)),
            )
            .param(ParamDef::optional(
                "includeDomains",
                ParamType::StringList,
                "Restrict results to these domains",
            )),
        Tool::new("filesystem", "File System", ToolCategory::Productivity)
            .describe("Local file system operations")
            .permission("fs:read")
            .permission("fs:write")
            .config_value("authRequired", json!(false))
            .param(ParamDef::optional(
                "operation",
                ParamType::Enum(vec![
                    "list_files".to_string(),
                    "read_file".to_string(),
                    "write_file".to_string(),
                ]),
                "File operation",
            ))
            .param(
                ParamDef::optional("path", ParamType::String, "Target path")
                    .with_default(json!(".")),
            ),
        Tool::new("desktop", "Desktop", ToolCategory::Productivity)
            .describe("Remote desktop session: boot, pointer, keyboard and app launch")
            .permission("desktop:control")
            .param(ParamDef::optional("x", ParamType::Integer, "Pointer x"))
            .param(ParamDef::optional("y", ParamType::Integer, "Pointer y"))
            .param(ParamDef::optional("text", ParamType::String, "Text, key or app name")),
        Tool::new("docker", "Docker", ToolCategory::Development)
            .describe("Container management and operations")
            .config_value("authRequired", json!(true))
            .disabled(),
        Tool::new("postgres", "PostgreSQL", ToolCategory::Development)
            .describe("Database operations and queries")
            .config_value("authRequired", json!(true))
            .disabled(),
    ]
}

// =============================================================================
// Registry
// =============================================================================

/// In-memory tool table. Listing preserves load order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from definitions, falling back to the built-in catalog
    /// when none are given.
    pub fn load(definitions: Vec<Tool>) -> Result<Self> {
        let definitions = if definitions.is_empty() {
            builtin_tools()
        } else {
            definitions
        };
        let mut registry = Self::new();
        for tool in definitions {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Register (or replace) a tool. Disabled tools are forced to `inactive`.
    pub fn register(&mut self, mut tool: Tool) -> Result<()> {
        if tool.id.trim().is_empty() {
            return Err(Error::validation("Tool id cannot be empty"));
        }
        if !tool.enabled {
            tool.status = ToolStatus::Inactive;
        }
        if !self.tools.contains_key(&tool.id) {
            self.order.push(tool.id.clone());
        }
        self.tools.insert(tool.id.clone(), tool);
        Ok(())
    }

    pub fn get(&self, tool_id: &str) -> Result<&Tool> {
        self.tools
            .get(tool_id)
            .ok_or_else(|| Error::tool_not_found(tool_id))
    }

    pub fn list(&self) -> Vec<&Tool> {
        self.order
            .iter()
            .filter_map(|id| self.tools.get(id))
            .collect()
    }

    /// Ids of enabled tools, in load order. These are the probed subsystems.
    pub fn enabled_ids(&self) -> Vec<String> {
        self.list()
            .into_iter()
            .filter(|t| t.enabled)
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn enabled_count(&self) -> usize {
        self.tools.values().filter(|t| t.enabled).count()
    }

    /// Update a tool's status; visible to every later `get`/`list`.
    pub fn set_status(&mut self, tool_id: &str, status: ToolStatus) -> Result<()> {
        let tool = self
            .tools
            .get_mut(tool_id)
            .ok_or_else(|| Error::tool_not_found(tool_id))?;
        if tool.status != status {
            tracing::info!(tool_id, from = ?tool.status, to = ?status, "tool status changed");
        }
        tool.status = status;
        Ok(())
    }

    /// Whether the tool exists, is enabled and is active.
    pub fn is_available(&self, tool_id: &str) -> bool {
        self.ensure_available(tool_id).is_ok()
    }

    /// Resolve a tool that can take an invocation right now.
    pub fn ensure_available(&self, tool_id: &str) -> Result<&Tool> {
        let tool = self.get(tool_id)?;
        if !tool.enabled {
            return Err(Error::tool_unavailable(format!("{} is disabled", tool_id)));
        }
        if tool.status != ToolStatus::Active {
            return Err(Error::tool_unavailable(format!(
                "{} is {}",
                tool_id,
                tool.status.as_str()
            )));
        }
        Ok(tool)
    }

    /// Validate parameters against a tool's declared schema.
    ///
    /// Returns a list of problems (empty = valid). Tools without a declared
    /// schema accept any object.
    pub fn validate_params(&self, tool_id: &str, params: &Map<String, Value>) -> Result<Vec<String>> {
        let tool = self.get(tool_id)?;
        if tool.parameters.is_empty() {
            return Ok(Vec::new());
        }

        let mut problems: Vec<String> = tool
            .parameters
            .iter()
            .filter(|p| p.is_required() && !params.contains_key(&p.name))
            .map(|p| format!("Missing required parameter: {}", p.name))
            .collect();

        for (key, value) in params {
            match tool.parameters.iter().find(|p| &p.name == key) {
                Some(def) => {
                    if let Err(e) = def.param_type.validate(value) {
                        problems.push(format!("Parameter '{}': {}", key, e));
                    }
                }
                None => problems.push(format!("Unknown parameter: {}", key)),
            }
        }

        Ok(problems)
    }

    /// Insert declared defaults for parameters the caller left out.
    pub fn fill_defaults(&self, tool_id: &str, params: &mut Map<String, Value>) -> Result<()> {
        let tool = self.get(tool_id)?;
        for def in &tool.parameters {
            if let Some(default) = &def.default {
                params
                    .entry(def.name.clone())
                    .or_insert_with(|| default.clone());
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
