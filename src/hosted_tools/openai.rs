//! OpenAI Responses API built-in tools
//!
//! [`BuiltinTool`] is a tagged union over the hosted tools the Responses API
//! understands. Its wire form is the tool object sent in the request's
//! `tools` array: a `type` discriminator plus only the fields defined for
//! that variant. Unset or zero-valued options are omitted so the backend
//! applies its own defaults.
//!
//! # Examples
//!
//! ```rust
//! use unillm::hosted_tools::openai;
//!
//! let web_search = openai::web_search()
//!     .with_user_location(openai::UserLocation::approximate().with_country("US"))
//!     .with_allowed_domains(vec!["docs.rs".to_string()])
//!     .build();
//!
//! let files = openai::file_search(vec!["vs_123".to_string()])
//!     .with_max_num_results(10)
//!     .build();
//!
//! let computer = openai::computer_use(1920, 1080, "browser").build();
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::fmt;

use crate::error::LlmError;

pub const WEB_SEARCH: &str = "web_search";
pub const FILE_SEARCH: &str = "file_search";
pub const CODE_INTERPRETER: &str = "code_interpreter";
pub const MCP: &str = "mcp";
pub const IMAGE_GENERATION: &str = "image_generation";
pub const COMPUTER_USE: &str = "computer_use_preview";
pub const SHELL: &str = "shell";
pub const APPLY_PATCH: &str = "apply_patch";

/// Built-in connector ids usable with [`mcp_connector`].
pub mod connectors {
    pub const DROPBOX: &str = "connector_dropbox";
    pub const GMAIL: &str = "connector_gmail";
    pub const GOOGLE_CALENDAR: &str = "connector_googlecalendar";
    pub const GOOGLE_DRIVE: &str = "connector_googledrive";
    pub const MICROSOFT_TEAMS: &str = "connector_microsoftteams";
    pub const OUTLOOK_CALENDAR: &str = "connector_outlookcalendar";
    pub const OUTLOOK_EMAIL: &str = "connector_outlookemail";
    pub const SHAREPOINT: &str = "connector_sharepoint";
}

/// A hosted tool configuration. Exactly one variant per instance.
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinTool {
    WebSearch(WebSearchConfig),
    FileSearch(FileSearchConfig),
    CodeInterpreter(CodeInterpreterConfig),
    /// Remote tool server (MCP) or built-in connector.
    Mcp(McpConfig),
    ImageGeneration(ImageGenerationConfig),
    ComputerUse(ComputerUseConfig),
    Shell,
    ApplyPatch,
}

impl BuiltinTool {
    /// Wire discriminator for this variant.
    pub const fn tool_type(&self) -> &'static str {
        match self {
            Self::WebSearch(_) => WEB_SEARCH,
            Self::FileSearch(_) => FILE_SEARCH,
            Self::CodeInterpreter(_) => CODE_INTERPRETER,
            Self::Mcp(_) => MCP,
            Self::ImageGeneration(_) => IMAGE_GENERATION,
            Self::ComputerUse(_) => COMPUTER_USE,
            Self::Shell => SHELL,
            Self::ApplyPatch => APPLY_PATCH,
        }
    }

    /// Encode as a Responses API tool object.
    pub fn to_wire(&self) -> Value {
        let mut tool = Map::new();
        tool.insert("type".into(), json!(self.tool_type()));

        match self {
            Self::WebSearch(cfg) => {
                put_str(&mut tool, "search_context_size", &cfg.search_context_size);
                if let Some(loc) = &cfg.user_location {
                    let mut loc_json = Map::new();
                    loc_json.insert("type".into(), json!(loc.kind));
                    put_str(&mut loc_json, "country", &loc.country);
                    put_str(&mut loc_json, "city", &loc.city);
                    put_str(&mut loc_json, "region", &loc.region);
                    put_str(&mut loc_json, "timezone", &loc.timezone);
                    tool.insert("user_location".into(), Value::Object(loc_json));
                }
                if !cfg.allowed_domains.is_empty() {
                    tool.insert(
                        "filters".into(),
                        json!({ "allowed_domains": cfg.allowed_domains }),
                    );
                }
            }
            Self::FileSearch(cfg) => {
                put_list(&mut tool, "vector_store_ids", &cfg.vector_store_ids);
                put_positive(&mut tool, "max_num_results", cfg.max_num_results);
                if let Some(filters) = cfg.filters.as_ref().filter(|f| !f.is_null()) {
                    tool.insert("filters".into(), filters.clone());
                }
            }
            Self::CodeInterpreter(cfg) => {
                let container = match &cfg.container {
                    Container::Id(id) => json!(id),
                    Container::Auto {
                        memory_limit,
                        file_ids,
                    } => {
                        let mut c = Map::new();
                        c.insert("type".into(), json!("auto"));
                        put_str(&mut c, "memory_limit", memory_limit);
                        put_list(&mut c, "file_ids", file_ids);
                        Value::Object(c)
                    }
                };
                tool.insert("container".into(), container);
            }
            Self::Mcp(cfg) => {
                put_str(&mut tool, "server_label", &Some(cfg.server_label.clone()));
                put_str(&mut tool, "server_url", &cfg.server_url);
                put_str(&mut tool, "server_description", &cfg.server_description);
                put_str(&mut tool, "connector_id", &cfg.connector_id);
                put_str(&mut tool, "authorization", &cfg.authorization);
                if let Some(policy) = &cfg.require_approval {
                    tool.insert("require_approval".into(), policy.to_wire());
                }
                put_list(&mut tool, "allowed_tools", &cfg.allowed_tools);
            }
            Self::ImageGeneration(cfg) => {
                put_str(&mut tool, "size", &cfg.size);
                put_str(&mut tool, "quality", &cfg.quality);
                put_str(&mut tool, "output_format", &cfg.output_format);
                put_positive(&mut tool, "output_compression", cfg.output_compression);
                put_str(&mut tool, "background", &cfg.background);
                put_positive(&mut tool, "partial_images", cfg.partial_images);
            }
            Self::ComputerUse(cfg) => {
                put_positive(&mut tool, "display_width", cfg.display_width);
                put_positive(&mut tool, "display_height", cfg.display_height);
                put_str(&mut tool, "environment", &cfg.environment);
            }
            Self::Shell | Self::ApplyPatch => {}
        }

        Value::Object(tool)
    }

    /// Decode a Responses API tool object (as sent, or as echoed back in a
    /// response body). Unknown discriminators are rejected.
    pub fn from_wire(value: &Value) -> Result<Self, LlmError> {
        let obj = value
            .as_object()
            .ok_or_else(|| LlmError::InvalidInput("built-in tool must be an object".into()))?;
        let tool_type = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::InvalidInput("built-in tool is missing `type`".into()))?;

        let tool = match tool_type {
            WEB_SEARCH | "web_search_preview" => Self::WebSearch(WebSearchConfig {
                search_context_size: get_str(obj, "search_context_size"),
                user_location: obj
                    .get("user_location")
                    .and_then(Value::as_object)
                    .map(|loc| UserLocation {
                        kind: get_str(loc, "type").unwrap_or_else(|| "approximate".into()),
                        country: get_str(loc, "country"),
                        city: get_str(loc, "city"),
                        region: get_str(loc, "region"),
                        timezone: get_str(loc, "timezone"),
                    }),
                allowed_domains: obj
                    .get("filters")
                    .and_then(Value::as_object)
                    .map(|f| get_list(f, "allowed_domains"))
                    .unwrap_or_default(),
            }),
            FILE_SEARCH => Self::FileSearch(FileSearchConfig {
                vector_store_ids: get_list(obj, "vector_store_ids"),
                max_num_results: get_positive(obj, "max_num_results"),
                filters: obj.get("filters").filter(|f| !f.is_null()).cloned(),
            }),
            CODE_INTERPRETER => {
                let container = match obj.get("container") {
                    Some(Value::String(id)) => Container::Id(id.clone()),
                    Some(Value::Object(c)) => Container::Auto {
                        memory_limit: get_str(c, "memory_limit"),
                        file_ids: get_list(c, "file_ids"),
                    },
                    _ => Container::default(),
                };
                Self::CodeInterpreter(CodeInterpreterConfig { container })
            }
            MCP => Self::Mcp(McpConfig {
                server_label: get_str(obj, "server_label").unwrap_or_default(),
                server_url: get_str(obj, "server_url"),
                server_description: get_str(obj, "server_description"),
                connector_id: get_str(obj, "connector_id"),
                authorization: get_str(obj, "authorization"),
                require_approval: obj.get("require_approval").and_then(ApprovalPolicy::from_wire),
                allowed_tools: get_list(obj, "allowed_tools"),
            }),
            IMAGE_GENERATION => Self::ImageGeneration(ImageGenerationConfig {
                size: get_str(obj, "size"),
                quality: get_str(obj, "quality"),
                output_format: get_str(obj, "output_format"),
                output_compression: get_positive(obj, "output_compression")
                    .or_else(|| get_positive(obj, "compression")),
                background: get_str(obj, "background"),
                partial_images: get_positive(obj, "partial_images"),
            }),
            COMPUTER_USE => Self::ComputerUse(ComputerUseConfig {
                display_width: get_positive(obj, "display_width"),
                display_height: get_positive(obj, "display_height"),
                environment: get_str(obj, "environment"),
            }),
            SHELL => Self::Shell,
            APPLY_PATCH => Self::ApplyPatch,
            other => {
                return Err(LlmError::InvalidInput(format!(
                    "unknown built-in tool type: {other}"
                )));
            }
        };
        Ok(tool)
    }
}

impl Serialize for BuiltinTool {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BuiltinTool {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        BuiltinTool::from_wire(&value).map_err(serde::de::Error::custom)
    }
}

fn put_str(obj: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        obj.insert(key.into(), json!(v));
    }
}

fn put_list(obj: &mut Map<String, Value>, key: &str, values: &[String]) {
    if !values.is_empty() {
        obj.insert(key.into(), json!(values));
    }
}

fn put_positive(obj: &mut Map<String, Value>, key: &str, value: Option<u32>) {
    if let Some(v) = value.filter(|v| *v > 0) {
        obj.insert(key.into(), json!(v));
    }
}

fn get_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn get_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn get_positive(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    obj.get(key)
        .and_then(Value::as_u64)
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
}

/// Web search configuration builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebSearchConfig {
    /// `low`, `medium` or `high`.
    pub search_context_size: Option<String>,
    pub user_location: Option<UserLocation>,
    pub allowed_domains: Vec<String>,
}

impl WebSearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_context_size(mut self, size: impl Into<String>) -> Self {
        self.search_context_size = Some(size.into());
        self
    }

    pub fn with_user_location(mut self, location: UserLocation) -> Self {
        self.user_location = Some(location);
        self
    }

    /// Restrict results to these domains.
    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = domains;
        self
    }

    pub fn build(self) -> BuiltinTool {
        BuiltinTool::WebSearch(self)
    }
}

/// User location for geo-targeted search results
#[derive(Debug, Clone, PartialEq)]
pub struct UserLocation {
    pub kind: String,
    /// ISO country code, e.g. `US`.
    pub country: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    /// IANA timezone, e.g. `America/New_York`.
    pub timezone: Option<String>,
}

impl UserLocation {
    pub fn approximate() -> Self {
        Self {
            kind: "approximate".into(),
            country: None,
            city: None,
            region: None,
            timezone: None,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// File search configuration builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSearchConfig {
    pub vector_store_ids: Vec<String>,
    pub max_num_results: Option<u32>,
    /// Attribute filter object, passed through as-is.
    pub filters: Option<Value>,
}

impl FileSearchConfig {
    pub fn new(vector_store_ids: Vec<String>) -> Self {
        Self {
            vector_store_ids,
            ..Default::default()
        }
    }

    pub fn with_max_num_results(mut self, n: u32) -> Self {
        self.max_num_results = Some(n);
        self
    }

    pub fn with_filters(mut self, filters: Value) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn build(self) -> BuiltinTool {
        BuiltinTool::FileSearch(self)
    }
}

/// Sandbox the code interpreter runs in.
#[derive(Debug, Clone, PartialEq)]
pub enum Container {
    /// Reuse an existing container.
    Id(String),
    /// Let the backend create one.
    Auto {
        /// `1g`, `4g`, `16g` or `64g`.
        memory_limit: Option<String>,
        file_ids: Vec<String>,
    },
}

impl Default for Container {
    fn default() -> Self {
        Self::Auto {
            memory_limit: None,
            file_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeInterpreterConfig {
    pub container: Container,
}

impl CodeInterpreterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.container = Container::Id(id.into());
        self
    }

    pub fn with_memory_limit(mut self, limit: impl Into<String>) -> Self {
        let file_ids = match std::mem::take(&mut self.container) {
            Container::Auto { file_ids, .. } => file_ids,
            Container::Id(_) => Vec::new(),
        };
        self.container = Container::Auto {
            memory_limit: Some(limit.into()),
            file_ids,
        };
        self
    }

    pub fn with_file_ids(mut self, ids: Vec<String>) -> Self {
        let memory_limit = match std::mem::take(&mut self.container) {
            Container::Auto { memory_limit, .. } => memory_limit,
            Container::Id(_) => None,
        };
        self.container = Container::Auto {
            memory_limit,
            file_ids: ids,
        };
        self
    }

    pub fn build(self) -> BuiltinTool {
        BuiltinTool::CodeInterpreter(self)
    }
}

/// Approval policy for remote tool server calls.
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalPolicy {
    Never,
    Always,
    /// Per-tool lists.
    Filtered {
        never: Vec<String>,
        always: Vec<String>,
    },
}

impl ApprovalPolicy {
    fn to_wire(&self) -> Value {
        match self {
            Self::Never => json!("never"),
            Self::Always => json!("always"),
            Self::Filtered { never, always } => {
                let mut obj = Map::new();
                if !never.is_empty() {
                    obj.insert("never".into(), json!({ "tool_names": never }));
                }
                if !always.is_empty() {
                    obj.insert("always".into(), json!({ "tool_names": always }));
                }
                Value::Object(obj)
            }
        }
    }

    fn from_wire(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if s == "never" => Some(Self::Never),
            Value::String(s) if s == "always" => Some(Self::Always),
            Value::Object(obj) => {
                let names = |key: &str| {
                    obj.get(key)
                        .and_then(Value::as_object)
                        .map(|f| get_list(f, "tool_names"))
                        .unwrap_or_default()
                };
                Some(Self::Filtered {
                    never: names("never"),
                    always: names("always"),
                })
            }
            _ => None,
        }
    }
}

/// Remote tool server (MCP) configuration builder
#[derive(Clone, PartialEq)]
pub struct McpConfig {
    pub server_label: String,
    pub server_url: Option<String>,
    pub server_description: Option<String>,
    /// Built-in connector id, see [`connectors`].
    pub connector_id: Option<String>,
    /// OAuth token or API key forwarded to the server.
    pub authorization: Option<String>,
    pub require_approval: Option<ApprovalPolicy>,
    pub allowed_tools: Vec<String>,
}

impl fmt::Debug for McpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpConfig")
            .field("server_label", &self.server_label)
            .field("server_url", &self.server_url)
            .field("server_description", &self.server_description)
            .field("connector_id", &self.connector_id)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "[REDACTED]"),
            )
            .field("require_approval", &self.require_approval)
            .field("allowed_tools", &self.allowed_tools)
            .finish()
    }
}

impl McpConfig {
    /// Remote server at `server_url`. Approval defaults to `never`.
    pub fn new(server_label: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            server_label: server_label.into(),
            server_url: Some(server_url.into()),
            server_description: None,
            connector_id: None,
            authorization: None,
            require_approval: Some(ApprovalPolicy::Never),
            allowed_tools: Vec::new(),
        }
    }

    /// Built-in connector. Approval defaults to `never`.
    pub fn connector(
        server_label: impl Into<String>,
        connector_id: impl Into<String>,
        authorization: impl Into<String>,
    ) -> Self {
        Self {
            server_label: server_label.into(),
            server_url: None,
            server_description: None,
            connector_id: Some(connector_id.into()),
            authorization: Some(authorization.into()),
            require_approval: Some(ApprovalPolicy::Never),
            allowed_tools: Vec::new(),
        }
    }

    pub fn with_server_description(mut self, desc: impl Into<String>) -> Self {
        self.server_description = Some(desc.into());
        self
    }

    pub fn with_authorization(mut self, token: impl Into<String>) -> Self {
        self.authorization = Some(token.into());
        self
    }

    pub fn with_require_approval(mut self, policy: ApprovalPolicy) -> Self {
        self.require_approval = Some(policy);
        self
    }

    pub fn with_allowed_tools(mut self, tools: Vec<String>) -> Self {
        self.allowed_tools = tools;
        self
    }

    pub fn build(self) -> BuiltinTool {
        BuiltinTool::Mcp(self)
    }
}

/// Image generation configuration builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageGenerationConfig {
    /// e.g. `1024x1024`, `1024x1536`, `auto`.
    pub size: Option<String>,
    /// `low`, `medium`, `high` or `auto`.
    pub quality: Option<String>,
    /// `png`, `jpeg` or `webp`.
    pub output_format: Option<String>,
    /// 0-100, JPEG/WebP only.
    pub output_compression: Option<u32>,
    /// `transparent`, `opaque` or `auto`.
    pub background: Option<String>,
    /// 1-3, streaming only.
    pub partial_images: Option<u32>,
}

impl ImageGenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn with_output_compression(mut self, compression: u32) -> Self {
        self.output_compression = Some(compression.min(100));
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }

    pub fn with_partial_images(mut self, n: u32) -> Self {
        self.partial_images = Some(n);
        self
    }

    pub fn build(self) -> BuiltinTool {
        BuiltinTool::ImageGeneration(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputerUseConfig {
    pub display_width: Option<u32>,
    pub display_height: Option<u32>,
    /// `browser`, `mac`, `windows` or `ubuntu`.
    pub environment: Option<String>,
}

impl ComputerUseConfig {
    pub fn build(self) -> BuiltinTool {
        BuiltinTool::ComputerUse(self)
    }
}

pub fn web_search() -> WebSearchConfig {
    WebSearchConfig::new()
}

pub fn file_search(vector_store_ids: Vec<String>) -> FileSearchConfig {
    FileSearchConfig::new(vector_store_ids)
}

/// Code interpreter in an automatically created container.
pub fn code_interpreter() -> CodeInterpreterConfig {
    CodeInterpreterConfig::new()
}

pub fn mcp(server_label: impl Into<String>, server_url: impl Into<String>) -> McpConfig {
    McpConfig::new(server_label, server_url)
}

pub fn mcp_connector(
    server_label: impl Into<String>,
    connector_id: impl Into<String>,
    authorization: impl Into<String>,
) -> McpConfig {
    McpConfig::connector(server_label, connector_id, authorization)
}

pub fn image_generation() -> ImageGenerationConfig {
    ImageGenerationConfig::new()
}

pub fn computer_use(
    display_width: u32,
    display_height: u32,
    environment: impl Into<String>,
) -> ComputerUseConfig {
    ComputerUseConfig {
        display_width: Some(display_width),
        display_height: Some(display_height),
        environment: Some(environment.into()),
    }
}

pub fn shell() -> BuiltinTool {
    BuiltinTool::Shell
}

pub fn apply_patch() -> BuiltinTool {
    BuiltinTool::ApplyPatch
}
