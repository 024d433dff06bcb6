//! Built-in and user-registered agent templates.

use crate::error::ManagerError;
use sk_protocol::agent_models::{
    AgentDefinition, AttractorBias, CostKind, GoalPrior, PerceptionConfig, SafetyConstraint,
};
use sk_protocol::layer::Layer;
use std::collections::BTreeMap;

/// Named agent blueprints.
///
/// Instantiating a template clones it with a fresh id and timestamps, so
/// agents created from the same template never share identity or mutate the
/// blueprint.
pub struct TemplateRegistry {
    templates: BTreeMap<String, AgentDefinition>,
}

impl TemplateRegistry {
    /// Registry pre-loaded with the built-in templates.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            templates: BTreeMap::new(),
        };
        registry.register("data-analyst", data_analyst());
        registry.register("sentinel", sentinel());
        registry.register("explorer", explorer());
        registry
    }

    /// Add or replace a template under `name`.
    pub fn register(&mut self, name: impl Into<String>, template: AgentDefinition) {
        self.templates.insert(name.into(), template);
    }

    /// Registered template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&AgentDefinition> {
        self.templates.get(name)
    }

    /// Clone the named template into a new definition with its own id.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::UnknownTemplate`] for an unregistered name.
    pub fn instantiate(&self, name: &str) -> Result<AgentDefinition, ManagerError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| ManagerError::UnknownTemplate(name.to_string()))?;
        let mut definition = AgentDefinition::new(template.name.clone(), template.body_basis.clone());
        definition.description = template.description.clone();
        definition.perception = template.perception.clone();
        definition.goals = template.goals.clone();
        definition.biases = template.biases.clone();
        definition.dynamics = template.dynamics;
        definition.safety = template.safety.clone();
        definition.metadata = template.metadata.clone();
        Ok(definition)
    }
}

fn data_analyst() -> AgentDefinition {
    let mut definition = AgentDefinition::new("data-analyst", vec![2, 3, 5, 7, 11, 13, 17]);
    definition.description = "Layer-heavy analyst biased towards data and semantic input".to_string();
    definition.perception = PerceptionConfig {
        input_layers: vec![Layer::Data, Layer::Semantic, Layer::Predictive],
        output_layers: vec![Layer::Semantic],
        attention_span: Layer::Data,
    };
    definition.goals = vec![
        GoalPrior {
            name: "thorough".to_string(),
            weight: 0.6,
            cost_kind: CostKind::Efficiency,
        },
        GoalPrior {
            name: "grounded".to_string(),
            weight: 0.8,
            cost_kind: CostKind::Alignment,
        },
    ];
    definition.biases = AttractorBias {
        preferred: vec![2, 3, 5],
        avoided: vec![17],
        weights: [(2, 1.2), (3, 1.1)].into_iter().collect(),
    };
    definition
}

fn sentinel() -> AgentDefinition {
    let mut definition = AgentDefinition::new("sentinel", vec![2, 3, 5, 7]);
    definition.description = "Cautious monitor with tight safety rails".to_string();
    definition.perception = PerceptionConfig {
        input_layers: vec![Layer::Data, Layer::Physical],
        output_layers: vec![Layer::Semantic],
        attention_span: Layer::Physical,
    };
    definition.goals = vec![GoalPrior {
        name: "contain".to_string(),
        weight: 1.0,
        cost_kind: CostKind::Safety,
    }];
    definition.safety = vec![SafetyConstraint::RateLimit {
        max_entropy_cost: 0.8,
    }];
    definition
}

fn explorer() -> AgentDefinition {
    let mut definition = AgentDefinition::new("explorer", vec![3, 5, 7, 11, 13]);
    definition.description = "Curiosity-weighted agent that favors layer shifts".to_string();
    definition.perception = PerceptionConfig {
        input_layers: vec![Layer::Semantic, Layer::Experiential, Layer::Communal],
        output_layers: vec![Layer::Semantic, Layer::Experiential],
        attention_span: Layer::Experiential,
    };
    definition.goals = vec![GoalPrior {
        name: "novelty".to_string(),
        weight: 0.7,
        cost_kind: CostKind::Creativity,
    }];
    definition.biases = AttractorBias {
        preferred: vec![11, 13],
        avoided: Vec::new(),
        weights: Default::default(),
    };
    definition
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_present() {
        let registry = TemplateRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["data-analyst", "explorer", "sentinel"]);
    }

    #[test]
    fn test_data_analyst_basis() {
        let registry = TemplateRegistry::with_builtins();
        let template = registry.get("data-analyst").expect("builtin");
        assert_eq!(template.body_basis, vec![2, 3, 5, 7, 11, 13, 17]);
    }

    #[test]
    fn test_instantiate_clones_with_fresh_identity() {
        let registry = TemplateRegistry::with_builtins();
        let a = registry.instantiate("sentinel").expect("instantiate");
        let b = registry.instantiate("sentinel").expect("instantiate");

        assert_ne!(a.id, b.id);
        assert_eq!(a.body_basis, b.body_basis);
        assert_eq!(a.safety, b.safety);
    }

    #[test]
    fn test_unknown_template_rejected() {
        let registry = TemplateRegistry::with_builtins();
        let err = registry.instantiate("oracle").unwrap_err();
        assert!(matches!(err, ManagerError::UnknownTemplate(name) if name == "oracle"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = TemplateRegistry::with_builtins();
        registry.register("sentinel", AgentDefinition::new("sentinel", vec![19, 23]));
        let template = registry.get("sentinel").expect("replaced");
        assert_eq!(template.body_basis, vec![19, 23]);
    }
}
