//! Typed variable bags with interned descriptors.
//!
//! Variables are declared once against a [`VariableRegistry`], which
//! assigns each a dense numeric id; a [`VariableBag`] then stores values
//! in a vector indexed by that id. Registries are built explicitly at
//! editor startup and shared by every bag.

use std::{
  collections::HashMap,
  sync::Arc,
};

use thiserror::Error;

use crate::Tendril;

pub type Result<T> = std::result::Result<T, VariableError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VariableError {
  #[error("variable {0:?} not found")]
  NotFound(String),
  #[error("variable {name:?} is {actual:?}, not {requested:?}")]
  TypeMismatch {
    name:      String,
    actual:    VariableType,
    requested: VariableType,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
  Bool,
  Int,
  Str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
  Bool(bool),
  Int(i64),
  Str(Tendril),
}

impl Value {
  fn variable_type(&self) -> VariableType {
    match self {
      Value::Bool(_) => VariableType::Bool,
      Value::Int(_) => VariableType::Int,
      Value::Str(_) => VariableType::Str,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableId(usize);

#[derive(Debug)]
struct Descriptor {
  name:    String,
  default: Value,
}

/// Builder and lookup table for a family of variables (one registry for
/// buffer variables, one for editor variables).
#[derive(Debug, Default)]
pub struct VariableRegistry {
  descriptors: Vec<Descriptor>,
  by_name:     HashMap<String, VariableId>,
}

impl VariableRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register_bool(&mut self, name: &str, default: bool) -> VariableId {
    self.register(name, Value::Bool(default))
  }

  pub fn register_int(&mut self, name: &str, default: i64) -> VariableId {
    self.register(name, Value::Int(default))
  }

  pub fn register_str(&mut self, name: &str, default: &str) -> VariableId {
    self.register(name, Value::Str(default.into()))
  }

  fn register(&mut self, name: &str, default: Value) -> VariableId {
    debug_assert!(
      !self.by_name.contains_key(name),
      "variable {name:?} registered twice"
    );
    let id = VariableId(self.descriptors.len());
    self.descriptors.push(Descriptor {
      name: name.into(),
      default,
    });
    self.by_name.insert(name.into(), id);
    id
  }

  pub fn lookup(&self, name: &str) -> Option<VariableId> {
    self.by_name.get(name).copied()
  }

  pub fn name(&self, id: VariableId) -> &str {
    &self.descriptors[id.0].name
  }

  pub fn len(&self) -> usize {
    self.descriptors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.descriptors.is_empty()
  }
}

/// Dense storage for one owner's variable values. Unset slots read as the
/// descriptor's default.
#[derive(Debug, Clone)]
pub struct VariableBag {
  registry: Arc<VariableRegistry>,
  values:   Vec<Option<Value>>,
}

impl VariableBag {
  pub fn new(registry: Arc<VariableRegistry>) -> Self {
    let values = vec![None; registry.len()];
    Self { registry, values }
  }

  pub fn registry(&self) -> &Arc<VariableRegistry> {
    &self.registry
  }

  fn value(&self, id: VariableId) -> &Value {
    self.values[id.0]
      .as_ref()
      .unwrap_or(&self.registry.descriptors[id.0].default)
  }

  fn check_type(&self, id: VariableId, requested: VariableType) -> Result<()> {
    let actual = self.value(id).variable_type();
    if actual != requested {
      return Err(VariableError::TypeMismatch {
        name: self.registry.name(id).into(),
        actual,
        requested,
      });
    }
    Ok(())
  }

  pub fn get_bool(&self, id: VariableId) -> Result<bool> {
    self.check_type(id, VariableType::Bool)?;
    match self.value(id) {
      Value::Bool(value) => Ok(*value),
      _ => unreachable!(),
    }
  }

  pub fn get_int(&self, id: VariableId) -> Result<i64> {
    self.check_type(id, VariableType::Int)?;
    match self.value(id) {
      Value::Int(value) => Ok(*value),
      _ => unreachable!(),
    }
  }

  pub fn get_str(&self, id: VariableId) -> Result<Tendril> {
    self.check_type(id, VariableType::Str)?;
    match self.value(id) {
      Value::Str(value) => Ok(value.clone()),
      _ => unreachable!(),
    }
  }

  pub fn set_bool(&mut self, id: VariableId, value: bool) -> Result<()> {
    self.set(id, Value::Bool(value))
  }

  pub fn set_int(&mut self, id: VariableId, value: i64) -> Result<()> {
    self.set(id, Value::Int(value))
  }

  pub fn set_str(&mut self, id: VariableId, value: impl Into<Tendril>) -> Result<()> {
    self.set(id, Value::Str(value.into()))
  }

  fn set(&mut self, id: VariableId, value: Value) -> Result<()> {
    self.check_type(id, value.variable_type())?;
    self.values[id.0] = Some(value);
    Ok(())
  }

  /// Looks a variable up by name, for the `set-variable` style prompts.
  pub fn set_by_name(&mut self, name: &str, value: Value) -> Result<()> {
    let id = self
      .registry
      .lookup(name)
      .ok_or_else(|| VariableError::NotFound(name.into()))?;
    self.set(id, value)
  }

  /// Copies every explicitly set value from `other`.
  pub fn copy_from(&mut self, other: &VariableBag) {
    debug_assert!(Arc::ptr_eq(&self.registry, &other.registry));
    for (slot, value) in self.values.iter_mut().zip(&other.values) {
      if value.is_some() {
        *slot = value.clone();
      }
    }
  }
}

/// The buffer variable set. Kept in one place so every buffer shares the
/// same ids.
#[derive(Debug, Clone)]
pub struct BufferVariables {
  pub registry:                  Arc<VariableRegistry>,
  pub pts:                       VariableId,
  pub close_after_clean_exit:    VariableId,
  pub reload_after_exit:         VariableId,
  pub default_reload_after_exit: VariableId,
  pub reload_on_enter:           VariableId,
  pub atomic_lines:              VariableId,
  pub save_on_close:             VariableId,
  pub clear_on_reload:           VariableId,
  pub paste_mode:                VariableId,
  pub follow_end_of_file:        VariableId,
  pub word_characters:           VariableId,
  pub symbol_characters:         VariableId,
  pub path_characters:           VariableId,
  pub path:                      VariableId,
  pub line_prefix_characters:    VariableId,
  pub editor_commands_path:      VariableId,
  pub lines_per_page:            VariableId,
  pub undo_limit:                VariableId,
}

impl BufferVariables {
  pub fn build() -> Self {
    let mut registry = VariableRegistry::new();
    let pts = registry.register_bool("pts", false);
    let close_after_clean_exit = registry.register_bool("close_after_clean_exit", false);
    let reload_after_exit = registry.register_bool("reload_after_exit", false);
    let default_reload_after_exit = registry.register_bool("default_reload_after_exit", false);
    let reload_on_enter = registry.register_bool("reload_on_enter", false);
    let atomic_lines = registry.register_bool("atomic_lines", false);
    let save_on_close = registry.register_bool("save_on_close", false);
    let clear_on_reload = registry.register_bool("clear_on_reload", true);
    let paste_mode = registry.register_bool("paste_mode", false);
    let follow_end_of_file = registry.register_bool("follow_end_of_file", false);
    let word_characters = registry.register_str("word_characters", "_");
    let symbol_characters = registry.register_str("symbol_characters", "_-./");
    let path_characters = registry.register_str("path_characters", "_-./~:");
    let path = registry.register_str("path", "");
    let line_prefix_characters = registry.register_str("line_prefix_characters", " ");
    let editor_commands_path = registry.register_str("editor_commands_path", "");
    let lines_per_page = registry.register_int("lines_per_page", 25);
    let undo_limit = registry.register_int("undo_limit", 1024);
    Self {
      registry: Arc::new(registry),
      pts,
      close_after_clean_exit,
      reload_after_exit,
      default_reload_after_exit,
      reload_on_enter,
      atomic_lines,
      save_on_close,
      clear_on_reload,
      paste_mode,
      follow_end_of_file,
      word_characters,
      symbol_characters,
      path_characters,
      path,
      line_prefix_characters,
      editor_commands_path,
      lines_per_page,
      undo_limit,
    }
  }
}
