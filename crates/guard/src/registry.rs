//! Static registry of method permission requirements.
//!
//! Requirements are parsed and compiled once, when the registry is built, and
//! looked up by method identity at dispatch time.

use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::btree_map::{BTreeMap, Entry};

use serde::{Deserialize, Serialize};
use warden_auth::{MalformedPermissionError, PermissionExpression};

use crate::error::RegistryError;
use crate::selector::Selector;

/// Identity of a guarded method (e.g. `"CaseService::list_cases"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(Cow<'static, str>);

impl MethodId {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for MethodId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for MethodId {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

/// Where a requirement applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetSlot {
    Parameter(usize),
    ReturnValue,
}

/// A permission expression together with its compiled selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    permission: PermissionExpression,
    selector: Selector,
}

impl Requirement {
    /// Parse and compile `raw`. When `binding` is given, the selector must
    /// bind exactly that identifier.
    pub fn compile(
        raw: impl Into<Cow<'static, str>>,
        binding: Option<&str>,
    ) -> Result<Self, MalformedPermissionError> {
        let permission = PermissionExpression::parse(raw)?;

        if let Some(expected) = binding
            && permission.binding() != expected
        {
            return Err(MalformedPermissionError::BindingMismatch {
                raw: permission.as_str().to_string(),
                expected: expected.to_string(),
                found: permission.binding().to_string(),
            });
        }

        let selector = Selector::compile(&permission)?;
        Ok(Self {
            permission,
            selector,
        })
    }

    pub fn permission(&self) -> &PermissionExpression {
        &self.permission
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// Requirements on one parameter, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterPolicy {
    index: usize,
    name: String,
    requirements: Vec<Requirement>,
}

impl ParameterPolicy {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }
}

/// All requirements declared by one method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodPolicy {
    parameters: BTreeMap<usize, ParameterPolicy>,
    return_value: Vec<Requirement>,
}

impl MethodPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare requirements on the parameter at `index`, bound as `name`.
    pub fn parameter<I, P>(mut self, index: usize, name: &str, permissions: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Cow<'static, str>>,
    {
        let requirements = permissions
            .into_iter()
            .map(|raw| Requirement::compile(raw, Some(name)))
            .collect::<Result<Vec<_>, _>>()?;

        match self.parameters.entry(index) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateParameter { index }),
            Entry::Vacant(slot) => {
                slot.insert(ParameterPolicy {
                    index,
                    name: name.to_string(),
                    requirements,
                });
                Ok(self)
            }
        }
    }

    /// Declare requirements on the return value. Each expression binds the
    /// result under its own identifier.
    pub fn returns<I, P>(mut self, permissions: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Cow<'static, str>>,
    {
        for raw in permissions {
            self.return_value.push(Requirement::compile(raw, None)?);
        }
        Ok(self)
    }

    /// Parameters with requirements, ordered by position.
    pub fn parameters(&self) -> impl Iterator<Item = &ParameterPolicy> {
        self.parameters.values()
    }

    pub fn return_value(&self) -> &[Requirement] {
        &self.return_value
    }

    pub fn requirements(&self, slot: TargetSlot) -> &[Requirement] {
        match slot {
            TargetSlot::Parameter(index) => self
                .parameters
                .get(&index)
                .map(|p| p.requirements.as_slice())
                .unwrap_or_default(),
            TargetSlot::ReturnValue => &self.return_value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.return_value.is_empty()
    }
}

/// Method → requirements, built once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    methods: HashMap<MethodId, MethodPolicy>,
}

impl PolicyRegistry {
    pub fn builder() -> PolicyRegistryBuilder {
        PolicyRegistryBuilder::default()
    }

    pub fn get(&self, method: &MethodId) -> Option<&MethodPolicy> {
        self.methods.get(method)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Build a registry from a JSON policy document:
    ///
    /// ```json
    /// {
    ///   "CaseService::update": {
    ///     "parameters": [{ "index": 0, "name": "c", "permissions": ["case:edit:c.county"] }],
    ///     "returns": ["case:view:r.county"]
    ///   }
    /// }
    /// ```
    pub fn from_json(document: &str) -> Result<Self, RegistryError> {
        let methods: BTreeMap<String, MethodDocument> =
            serde_json::from_str(document).map_err(|e| RegistryError::Document(e.to_string()))?;

        let mut builder = Self::builder();
        for (name, doc) in methods {
            let mut policy = MethodPolicy::new();
            for param in doc.parameters {
                policy = policy.parameter(param.index, &param.name, param.permissions)?;
            }
            policy = policy.returns(doc.returns)?;
            builder = builder.register(MethodId::new(name), policy)?;
        }
        Ok(builder.build())
    }
}

#[derive(Debug, Default)]
pub struct PolicyRegistryBuilder {
    methods: HashMap<MethodId, MethodPolicy>,
}

impl PolicyRegistryBuilder {
    pub fn register(
        mut self,
        method: impl Into<MethodId>,
        policy: MethodPolicy,
    ) -> Result<Self, RegistryError> {
        let method = method.into();
        if self.methods.contains_key(&method) {
            return Err(RegistryError::DuplicateMethod(method));
        }
        self.methods.insert(method, policy);
        Ok(self)
    }

    pub fn build(self) -> PolicyRegistry {
        PolicyRegistry {
            methods: self.methods,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MethodDocument {
    #[serde(default)]
    parameters: Vec<ParameterDocument>,
    #[serde(default)]
    returns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParameterDocument {
    index: usize,
    name: String,
    permissions: Vec<String>,
}
