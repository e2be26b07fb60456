use serde_json::{json, Map, Value};

/// Static metadata for one invocable capability: name, description, and a
/// JSON-Schema-like parameter schema carrying per-field defaults.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

impl ToolDescriptor {
    /// Wire form returned from `list_tools`.
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.schema,
        })
    }

    /// Merge caller parameters over this tool's declared defaults.
    ///
    /// First-defined-wins per field with a presence check, so a caller's
    /// explicit `false` or `0` survives. A caller-supplied `null` counts as
    /// absent. Defaults come from the schema's `properties.*.default`.
    pub fn merge_defaults(&self, caller: &Map<String, Value>) -> Map<String, Value> {
        let mut merged: Map<String, Value> = caller
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if let Some(props) = self.schema["properties"].as_object() {
            for (field, spec) in props {
                if merged.contains_key(field) {
                    continue;
                }
                if let Some(default) = spec.get("default") {
                    merged.insert(field.clone(), default.clone());
                }
            }
        }

        merged
    }
}

/// Catalog of available tools. Fixed at startup, shared read-only across
/// any number of in-flight dispatches.
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn add(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
    ) -> Self {
        self.tools.push(ToolDescriptor {
            name: name.into(),
            description: description.into(),
            schema,
        });
        self
    }

    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Look up a descriptor by exact name. Linear scan; the registry is tiny.
    pub fn find(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The one capability this bridge exposes.
pub fn default_registry() -> ToolRegistry {
    ToolRegistry::new().add(
        "generate_image",
        "Generates an image using Replicate's Flux 1.1 Pro model.",
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "A detailed description of the image to generate"
                },
                "aspect_ratio": {
                    "type": "string",
                    "enum": ["1:1", "16:9", "9:16", "4:3", "3:4"],
                    "default": "1:1",
                    "description": "The aspect ratio of the output image"
                },
                "output_format": {
                    "type": "string",
                    "default": "webp",
                    "description": "Format of the output image"
                },
                "output_quality": {
                    "type": "integer",
                    "default": 80,
                    "description": "Quality of the output image (1-100)"
                },
                "safety_tolerance": {
                    "type": "integer",
                    "default": 2,
                    "description": "Safety tolerance level (0-3)"
                },
                "prompt_upsampling": {
                    "type": "boolean",
                    "default": true,
                    "description": "Whether to use prompt upsampling"
                }
            },
            "required": ["prompt"]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn registry_has_exactly_generate_image() {
        let reg = default_registry();
        assert_eq!(reg.len(), 1);
        assert!(reg.find("generate_image").is_some());
        assert!(reg.find("generate_video").is_none());
    }

    #[test]
    fn only_prompt_is_required() {
        let reg = default_registry();
        let tool = reg.find("generate_image").unwrap();
        let required = tool.schema["required"].as_array().unwrap();
        assert_eq!(required, &vec![json!("prompt")]);
    }

    #[test]
    fn prompt_only_call_gets_all_five_defaults() {
        let reg = default_registry();
        let tool = reg.find("generate_image").unwrap();
        let merged = tool.merge_defaults(&params(&[("prompt", json!("a red fox"))]));

        assert_eq!(merged["prompt"], "a red fox");
        assert_eq!(merged["aspect_ratio"], "1:1");
        assert_eq!(merged["output_format"], "webp");
        assert_eq!(merged["output_quality"], 80);
        assert_eq!(merged["safety_tolerance"], 2);
        assert_eq!(merged["prompt_upsampling"], true);
        assert_eq!(merged.len(), 6);
    }

    #[test]
    fn explicit_false_beats_default_true() {
        let reg = default_registry();
        let tool = reg.find("generate_image").unwrap();
        let merged = tool.merge_defaults(&params(&[
            ("prompt", json!("x")),
            ("prompt_upsampling", json!(false)),
        ]));
        assert_eq!(merged["prompt_upsampling"], false);
    }

    #[test]
    fn explicit_zero_beats_integer_default() {
        let reg = default_registry();
        let tool = reg.find("generate_image").unwrap();
        let merged = tool.merge_defaults(&params(&[
            ("prompt", json!("x")),
            ("safety_tolerance", json!(0)),
        ]));
        assert_eq!(merged["safety_tolerance"], 0);
    }

    #[test]
    fn explicit_null_counts_as_absent() {
        let reg = default_registry();
        let tool = reg.find("generate_image").unwrap();
        let merged = tool.merge_defaults(&params(&[
            ("prompt", json!("x")),
            ("aspect_ratio", Value::Null),
        ]));
        assert_eq!(merged["aspect_ratio"], "1:1");
    }

    #[test]
    fn extra_caller_fields_pass_through() {
        let reg = default_registry();
        let tool = reg.find("generate_image").unwrap();
        let merged = tool.merge_defaults(&params(&[
            ("prompt", json!("x")),
            ("seed", json!(1234)),
        ]));
        assert_eq!(merged["seed"], 1234);
    }
}
