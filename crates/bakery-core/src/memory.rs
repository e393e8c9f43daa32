//! In-memory host model.
//!
//! [`MemoryStruct`] and [`MemoryGraph`] behave like the host's settings
//! structs and shader graphs: read-only fields refuse writes, choice fields
//! reject illegal values with a host-style message, unset pointers read as
//! `None`, and an input socket holds at most one link. They back the test
//! suites and the CLI's offline scenes.

use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::graph::{GraphNode, LinkEndpoints, NodeGraph, SocketType};
use crate::reflect::{FieldDescriptor, FieldKind, Subject};
use crate::value::Value;

fn yes() -> bool {
    true
}

/// Data held by a [`MemoryField`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldData {
    /// Scalar value.
    Scalar { value: Value },
    /// Choice value with its legal options.
    Choice {
        value: String,
        options: Vec<String>,
        /// Whether `choice_options` reports the options. Hosts are not
        /// always able to.
        #[serde(default = "yes")]
        introspectable: bool,
    },
    /// Pointer to a nested struct.
    Nested {
        #[serde(default)]
        value: Option<Box<MemoryStruct>>,
    },
    /// List of structs.
    Collection {
        #[serde(default)]
        items: Vec<MemoryStruct>,
    },
}

impl FieldData {
    fn kind(&self) -> FieldKind {
        match self {
            FieldData::Scalar { .. } => FieldKind::Scalar,
            FieldData::Choice { .. } => FieldKind::Choice,
            FieldData::Nested { .. } => FieldKind::Nested,
            FieldData::Collection { .. } => FieldKind::Collection,
        }
    }
}

/// A named field of a [`MemoryStruct`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryField {
    pub name: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(flatten)]
    pub data: FieldData,
}

/// A host-like settings struct held in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStruct {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    fields: Vec<MemoryField>,
    /// Names passed to `set`, including refused writes.
    #[serde(skip)]
    write_log: Vec<String>,
}

impl MemoryStruct {
    /// Creates an empty struct of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            write_log: Vec::new(),
        }
    }

    fn push(mut self, name: impl Into<String>, read_only: bool, data: FieldData) -> Self {
        let name = name.into();
        self.fields.retain(|f| f.name != name);
        self.fields.push(MemoryField {
            name,
            read_only,
            data,
        });
        self
    }

    /// Adds a writable scalar field.
    pub fn scalar(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(
            name,
            false,
            FieldData::Scalar {
                value: value.into(),
            },
        )
    }

    /// Adds a read-only scalar field.
    pub fn read_only_scalar(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(
            name,
            true,
            FieldData::Scalar {
                value: value.into(),
            },
        )
    }

    /// Adds a choice field whose options the host reports.
    pub fn choice(
        self,
        name: impl Into<String>,
        value: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.push(
            name,
            false,
            FieldData::Choice {
                value: value.into(),
                options: options.into_iter().map(Into::into).collect(),
                introspectable: true,
            },
        )
    }

    /// Adds a choice field whose options the host can't report.
    pub fn opaque_choice(
        self,
        name: impl Into<String>,
        value: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.push(
            name,
            false,
            FieldData::Choice {
                value: value.into(),
                options: options.into_iter().map(Into::into).collect(),
                introspectable: false,
            },
        )
    }

    /// Adds a pointer to a nested struct.
    pub fn nested(self, name: impl Into<String>, value: MemoryStruct) -> Self {
        self.push(
            name,
            true,
            FieldData::Nested {
                value: Some(Box::new(value)),
            },
        )
    }

    /// Adds an unset pointer.
    pub fn unset(self, name: impl Into<String>) -> Self {
        self.push(name, false, FieldData::Nested { value: None })
    }

    /// Adds a collection field.
    pub fn collection(self, name: impl Into<String>, items: Vec<MemoryStruct>) -> Self {
        self.push(name, true, FieldData::Collection { items })
    }

    /// Returns the field with this name.
    pub fn field(&self, name: &str) -> Option<&MemoryField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the field with this name for direct modification, bypassing
    /// host checks.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut MemoryField> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Replaces the option set of a choice field, as a host does when an
    /// extension registers or unregisters.
    pub fn set_options(&mut self, name: &str, new_options: Vec<String>) -> bool {
        match self.field_mut(name).map(|f| &mut f.data) {
            Some(FieldData::Choice { options, .. }) => {
                *options = new_options;
                true
            }
            _ => false,
        }
    }

    /// Names passed to `set` on this struct, in order.
    pub fn writes(&self) -> &[String] {
        &self.write_log
    }

    /// Dotted names passed to `set` on this struct and every nested struct.
    pub fn all_writes(&self) -> Vec<String> {
        let mut out = self.write_log.clone();
        for field in &self.fields {
            if let FieldData::Nested { value: Some(inner) } = &field.data {
                out.extend(
                    inner
                        .all_writes()
                        .into_iter()
                        .map(|w| format!("{}.{}", field.name, w)),
                );
            }
        }
        out
    }

    /// Clears the write log of this struct and every nested struct.
    pub fn clear_writes(&mut self) {
        self.write_log.clear();
        for field in &mut self.fields {
            if let FieldData::Nested { value: Some(inner) } = &mut field.data {
                inner.clear_writes();
            }
        }
    }

    fn no_such_field(&self, name: &str) -> HostError {
        HostError::NoSuchField {
            type_name: self.type_name.clone(),
            field: name.to_string(),
        }
    }
}

fn invalid_choice_message(value: &str, options: &[String]) -> String {
    let quoted: Vec<String> = options.iter().map(|o| format!("'{}'", o)).collect();
    format!(
        "bpy_struct: item.attr = val: enum \"{}\" not found in ({})",
        value,
        quoted.join(", ")
    )
}

fn scalar_compatible(current: &Value, new: &Value) -> bool {
    match (current, new) {
        (Value::Null, _) | (_, Value::Null) => true,
        (Value::Float(_), Value::Int(_)) => true,
        (Value::Array(a), Value::Array(b)) => a.len() == b.len(),
        (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
    }
}

impl Subject for MemoryStruct {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        self.fields
            .iter()
            .map(|f| FieldDescriptor {
                name: f.name.clone(),
                kind: f.data.kind(),
                read_only: f.read_only,
            })
            .collect()
    }

    fn get(&self, name: &str) -> Result<Value, HostError> {
        let field = self.field(name).ok_or_else(|| self.no_such_field(name))?;
        match &field.data {
            FieldData::Scalar { value } => Ok(value.clone()),
            FieldData::Choice { value, .. } => Ok(Value::Str(value.clone())),
            FieldData::Nested { value: None } => Ok(Value::Null),
            FieldData::Nested { value: Some(_) } | FieldData::Collection { .. } => Err(
                HostError::rejected(format!("'{}' is not a scalar field", name)),
            ),
        }
    }

    fn nested(&self, name: &str) -> Result<Option<&dyn Subject>, HostError> {
        let field = self.field(name).ok_or_else(|| self.no_such_field(name))?;
        match &field.data {
            FieldData::Nested { value } => Ok(value.as_deref().map(|s| s as &dyn Subject)),
            _ => Err(HostError::rejected(format!("'{}' is not a struct pointer", name))),
        }
    }

    fn nested_mut(&mut self, name: &str) -> Result<Option<&mut dyn Subject>, HostError> {
        let missing = self.no_such_field(name);
        let field = self.field_mut(name).ok_or(missing)?;
        match &mut field.data {
            FieldData::Nested { value } => Ok(value.as_deref_mut().map(|s| s as &mut dyn Subject)),
            _ => Err(HostError::rejected(format!("'{}' is not a struct pointer", name))),
        }
    }

    fn set(&mut self, name: &str, new: &Value) -> Result<(), HostError> {
        self.write_log.push(name.to_string());
        let missing = self.no_such_field(name);
        let field = self.field_mut(name).ok_or(missing)?;
        if field.read_only {
            return Err(HostError::ReadOnly {
                field: name.to_string(),
            });
        }
        match &mut field.data {
            FieldData::Scalar { value } => {
                if !scalar_compatible(value, new) {
                    return Err(HostError::WrongType {
                        field: name.to_string(),
                        expected: value.kind_name(),
                        found: new.kind_name(),
                    });
                }
                *value = match (&*value, new) {
                    (Value::Float(_), Value::Int(i)) => Value::Float(*i as f64),
                    _ => new.clone(),
                };
                Ok(())
            }
            FieldData::Choice { value, options, .. } => {
                let requested = new.as_str().ok_or(HostError::WrongType {
                    field: name.to_string(),
                    expected: "string",
                    found: new.kind_name(),
                })?;
                if !options.iter().any(|o| o == requested) {
                    return Err(HostError::InvalidChoice {
                        field: name.to_string(),
                        message: invalid_choice_message(requested, options),
                    });
                }
                *value = requested.to_string();
                Ok(())
            }
            FieldData::Nested { .. } | FieldData::Collection { .. } => Err(HostError::rejected(
                format!("'{}' can't be assigned a scalar value", name),
            )),
        }
    }

    fn choice_options(&self, name: &str) -> Option<Vec<String>> {
        match &self.field(name)?.data {
            FieldData::Choice {
                options,
                introspectable: true,
                ..
            } => Some(options.clone()),
            _ => None,
        }
    }
}

/// A socket on a [`MemoryNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySocket {
    pub name: String,
    #[serde(rename = "type")]
    pub socket_type: SocketType,
    #[serde(default = "null")]
    pub default: Value,
}

fn null() -> Value {
    Value::Null
}

/// A node held in a [`MemoryGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryNode {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub inputs: Vec<MemorySocket>,
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Image assigned to an image texture node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl MemoryNode {
    /// Creates a node with no sockets.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            label: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            image: None,
        }
    }

    /// Adds an input socket.
    pub fn input(
        mut self,
        name: impl Into<String>,
        socket_type: SocketType,
        default: impl Into<Value>,
    ) -> Self {
        self.inputs.push(MemorySocket {
            name: name.into(),
            socket_type,
            default: default.into(),
        });
        self
    }

    /// Adds an output socket.
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    /// Returns the input socket with this name.
    pub fn input_socket(&self, name: &str) -> Option<&MemorySocket> {
        self.inputs.iter().find(|s| s.name == name)
    }

    /// Returns the input socket with this name for modification.
    pub fn input_socket_mut(&mut self, name: &str) -> Option<&mut MemorySocket> {
        self.inputs.iter_mut().find(|s| s.name == name)
    }
}

impl GraphNode for MemoryNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_input(&self, socket: &str) -> bool {
        self.input_socket(socket).is_some()
    }

    fn has_output(&self, socket: &str) -> bool {
        self.outputs.iter().any(|s| s == socket)
    }
}

/// A host-like shader graph held in memory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryGraph {
    pub label: String,
    #[serde(default)]
    nodes: Vec<MemoryNode>,
    #[serde(default)]
    links: Vec<LinkEndpoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active: Option<String>,
}

impl MemoryGraph {
    /// Creates an empty graph.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Adds a node and returns the name it was given.
    ///
    /// A name already in use gets a numeric suffix (`Emission.001`), the way
    /// the host names duplicates.
    pub fn add_node(&mut self, mut node: MemoryNode) -> String {
        if self.find(&node.name).is_some() {
            let base = node.name.clone();
            let mut n = 1;
            while self.find(&format!("{}.{:03}", base, n)).is_some() {
                n += 1;
            }
            node.name = format!("{}.{:03}", base, n);
        }
        let name = node.name.clone();
        self.nodes.push(node);
        name
    }

    /// Adds a node and returns the graph.
    pub fn with_node(mut self, node: MemoryNode) -> Self {
        self.add_node(node);
        self
    }

    /// Adds a link and returns the graph.
    ///
    /// Endpoints are taken as given, as for a graph read from JSON. A link
    /// already feeding the same input is replaced.
    pub fn with_link(mut self, link: LinkEndpoints) -> Self {
        self.links
            .retain(|l| !(l.to_node == link.to_node && l.to_socket == link.to_socket));
        self.links.push(link);
        self
    }

    /// Removes a node and every link touching it.
    pub fn remove_node(&mut self, name: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.name != name);
        self.links.retain(|l| l.from_node != name && l.to_node != name);
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        self.nodes.len() != before
    }

    /// Returns the node with this name.
    pub fn find(&self, name: &str) -> Option<&MemoryNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Returns the node with this name for modification.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut MemoryNode> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    /// Returns all nodes.
    pub fn nodes(&self) -> &[MemoryNode] {
        &self.nodes
    }

    /// Returns all links.
    pub fn links(&self) -> &[LinkEndpoints] {
        &self.links
    }

    /// Returns the active node name.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Sets the active node.
    pub fn set_active(&mut self, name: &str) -> bool {
        if self.find(name).is_some() {
            self.active = Some(name.to_string());
            true
        } else {
            false
        }
    }
}

impl NodeGraph for MemoryGraph {
    type Node = MemoryNode;

    fn label(&self) -> &str {
        &self.label
    }

    fn find_node(&self, name: &str) -> Option<&MemoryNode> {
        self.find(name)
    }

    fn incoming_link(&self, node: &str, input: &str) -> Option<LinkEndpoints> {
        self.links
            .iter()
            .find(|l| l.to_node == node && l.to_socket == input)
            .cloned()
    }

    fn connect(&mut self, link: &LinkEndpoints) -> Result<(), HostError> {
        let from_ok = self
            .find(&link.from_node)
            .is_some_and(|n| n.has_output(&link.from_socket));
        let to_ok = self
            .find(&link.to_node)
            .is_some_and(|n| n.has_input(&link.to_socket));
        if !from_ok || !to_ok {
            return Err(HostError::rejected(format!("can't link {}", link)));
        }
        self.links
            .retain(|l| !(l.to_node == link.to_node && l.to_socket == link.to_socket));
        self.links.push(link.clone());
        Ok(())
    }
}
