//! Static guidance prompts served by name.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Prompt {
    pub name: &'static str,
    pub description: &'static str,
    pub text: &'static str,
}

const PROMPTS: &[Prompt] = &[
    Prompt {
        name: "population_data_guidance",
        description: "Guidance for querying population data from HDX.",
        text: include_str!("../prompts/population_data_guidance.md"),
    },
    Prompt {
        name: "hdx_usage_instructions",
        description: "Instructions for using HDX tools effectively.",
        text: include_str!("../prompts/hdx_usage_instructions.md"),
    },
    Prompt {
        name: "data_coverage_guidance",
        description: "Critical guidance for understanding and verifying data coverage in HDX.",
        text: include_str!("../prompts/data_coverage_guidance.md"),
    },
];

#[must_use]
pub fn list_prompts() -> &'static [Prompt] {
    PROMPTS
}

#[must_use]
pub fn get_prompt(name: &str) -> Option<&'static Prompt> {
    PROMPTS.iter().find(|p| p.name == name)
}
