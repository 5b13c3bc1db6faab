//! Heap management for the script runtime.
//!
//! Objects and arrays live in an arena owned by a single evaluation. The heap
//! limit is charged for what the cells currently hold: overwriting, popping or
//! truncating releases the old contents. Cells themselves are only freed when
//! the whole heap is dropped, so reference cycles cannot leak past the
//! evaluation that built them. Strings outside cells (bindings, temporaries)
//! are bounded one at a time by the string length limit instead.

use std::collections::HashMap;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;

const CELL_OVERHEAD_BYTES: usize = 48;
const SLOT_BYTES: usize = 24;

/// Configuration for the heap manager.
#[derive(Debug, Clone, Default)]
pub struct HeapConfig {
    /// Maximum heap size in bytes. None means unlimited.
    pub max_bytes: Option<usize>,
    /// Maximum number of elements in one array or keys in one object.
    pub max_collection_length: Option<usize>,
}

impl HeapConfig {
    /// Create a new heap configuration with no limits.
    pub fn unlimited() -> Self {
        HeapConfig {
            max_bytes: None,
            max_collection_length: None,
        }
    }

    /// Create a new heap configuration with a memory limit.
    pub fn with_limit(max_bytes: usize) -> Self {
        HeapConfig {
            max_bytes: Some(max_bytes),
            max_collection_length: None,
        }
    }

    pub fn with_collection_limit(mut self, max_collection_length: usize) -> Self {
        self.max_collection_length = Some(max_collection_length);
        self
    }
}

/// Index of a cell in the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapRef(usize);

/// Properties of a plain object, remembering insertion order.
#[derive(Debug, Clone, Default)]
pub struct ObjectData {
    order: Vec<String>,
    values: HashMap<String, JsValue>,
}

impl ObjectData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&JsValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns true when `key` was not present before.
    pub fn insert(&mut self, key: String, value: JsValue) -> bool {
        if let Some(slot) = self.values.get_mut(&key) {
            *slot = value;
            return false;
        }
        self.order.push(key.clone());
        self.values.insert(key, value);
        true
    }

    /// Own keys in property order: integer-like keys ascending, then the rest
    /// in insertion order.
    pub fn keys(&self) -> Vec<String> {
        let mut indices: Vec<(u32, &String)> = self
            .order
            .iter()
            .filter_map(|k| array_index(k).map(|i| (i, k)))
            .collect();
        indices.sort_by_key(|(i, _)| *i);
        let mut keys: Vec<String> = indices.into_iter().map(|(_, k)| k.clone()).collect();
        keys.extend(
            self.order
                .iter()
                .filter(|k| array_index(k).is_none())
                .cloned(),
        );
        keys
    }

    pub fn entries(&self) -> Vec<(String, JsValue)> {
        self.keys()
            .into_iter()
            .map(|k| {
                let v = self.values.get(&k).cloned().unwrap_or(JsValue::Undefined);
                (k, v)
            })
            .collect()
    }
}

/// Canonical array index form of a property key (`"0"`, `"17"`, not `"01"`).
pub fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().filter(|i| *i != u32::MAX)
}

#[derive(Debug, Clone)]
pub enum HeapCell {
    Array(Vec<JsValue>),
    Object(ObjectData),
}

/// Heap manager for tracking memory allocations.
#[derive(Debug)]
pub struct Heap {
    config: HeapConfig,
    allocated_bytes: usize,
    cells: Vec<HeapCell>,
}

impl Heap {
    /// Create a new heap with the given configuration.
    pub fn new(config: HeapConfig) -> Self {
        Heap {
            config,
            allocated_bytes: 0,
            cells: Vec::new(),
        }
    }

    /// Charge `bytes` to the heap.
    ///
    /// Returns an error if the allocation would exceed the memory limit.
    pub fn allocate(&mut self, bytes: usize) -> Result<(), JErrorType> {
        if let Some(max_bytes) = self.config.max_bytes {
            if self.allocated_bytes.saturating_add(bytes) > max_bytes {
                return Err(JErrorType::ResourceExceeded {
                    resource: "heap",
                    limit: max_bytes,
                });
            }
        }
        self.allocated_bytes += bytes;
        Ok(())
    }

    /// Give back bytes whose contents are no longer stored.
    fn release(&mut self, bytes: usize) {
        self.allocated_bytes = self.allocated_bytes.saturating_sub(bytes);
    }

    /// Swap a stored value of `old_bytes` for one of `new_bytes`.
    fn replace(&mut self, old_bytes: usize, new_bytes: usize) -> Result<(), JErrorType> {
        if new_bytes > old_bytes {
            self.allocate(new_bytes - old_bytes)
        } else {
            self.release(old_bytes - new_bytes);
            Ok(())
        }
    }

    /// Bytes currently charged.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    /// Approximate footprint of one stored value.
    pub fn value_size(value: &JsValue) -> usize {
        SLOT_BYTES
            + match value {
                JsValue::String(s) => s.len(),
                _ => 0,
            }
    }

    fn check_length(&self, length: usize) -> Result<(), JErrorType> {
        match self.config.max_collection_length {
            Some(max) if length > max => Err(JErrorType::ResourceExceeded {
                resource: "collection length",
                limit: max,
            }),
            _ => Ok(()),
        }
    }

    fn push_cell(&mut self, cell: HeapCell, bytes: usize) -> Result<HeapRef, JErrorType> {
        self.allocate(CELL_OVERHEAD_BYTES + bytes)?;
        self.cells.push(cell);
        Ok(HeapRef(self.cells.len() - 1))
    }

    pub fn alloc_array(&mut self, elements: Vec<JsValue>) -> Result<HeapRef, JErrorType> {
        self.check_length(elements.len())?;
        let bytes = elements.iter().map(Heap::value_size).sum();
        self.push_cell(HeapCell::Array(elements), bytes)
    }

    pub fn alloc_object(&mut self, data: ObjectData) -> Result<HeapRef, JErrorType> {
        self.check_length(data.len())?;
        let bytes = data
            .order
            .iter()
            .map(|k| k.len() + data.values.get(k).map(Heap::value_size).unwrap_or(SLOT_BYTES))
            .sum();
        self.push_cell(HeapCell::Object(data), bytes)
    }

    pub fn get(&self, r: HeapRef) -> &HeapCell {
        &self.cells[r.0]
    }

    pub fn is_array(&self, r: HeapRef) -> bool {
        matches!(self.cells[r.0], HeapCell::Array(_))
    }

    pub fn array_len(&self, r: HeapRef) -> Option<usize> {
        match &self.cells[r.0] {
            HeapCell::Array(elements) => Some(elements.len()),
            HeapCell::Object(_) => None,
        }
    }

    /// Mutable access to an array's elements for in-place reordering.
    pub fn array_mut(&mut self, r: HeapRef) -> Option<&mut Vec<JsValue>> {
        match &mut self.cells[r.0] {
            HeapCell::Array(elements) => Some(elements),
            HeapCell::Object(_) => None,
        }
    }

    pub fn array_push(&mut self, r: HeapRef, value: JsValue) -> Result<usize, JErrorType> {
        let length = self.array_len(r).unwrap_or(0) + 1;
        self.check_length(length)?;
        self.allocate(Heap::value_size(&value))?;
        if let HeapCell::Array(elements) = &mut self.cells[r.0] {
            elements.push(value);
        }
        Ok(length)
    }

    pub fn array_pop(&mut self, r: HeapRef) -> Option<JsValue> {
        let popped = match &mut self.cells[r.0] {
            HeapCell::Array(elements) => elements.pop(),
            HeapCell::Object(_) => None,
        };
        if let Some(value) = &popped {
            self.release(Heap::value_size(value));
        }
        popped
    }

    /// Store `value` at `index`, padding any gap with `undefined`.
    pub fn array_set(&mut self, r: HeapRef, index: usize, value: JsValue) -> Result<(), JErrorType> {
        let current = self.array_len(r).unwrap_or(0);
        let grow_by = (index + 1).saturating_sub(current);
        if grow_by > 0 {
            self.check_length(index + 1)?;
            self.allocate(grow_by * SLOT_BYTES)?;
        }
        let old_bytes = match &self.cells[r.0] {
            HeapCell::Array(elements) => elements.get(index).map(Heap::value_size).unwrap_or(SLOT_BYTES),
            HeapCell::Object(_) => SLOT_BYTES,
        };
        self.replace(old_bytes, Heap::value_size(&value))?;
        if let HeapCell::Array(elements) = &mut self.cells[r.0] {
            if grow_by > 0 {
                elements.resize(index + 1, JsValue::Undefined);
            }
            elements[index] = value;
        }
        Ok(())
    }

    pub fn array_set_length(&mut self, r: HeapRef, length: usize) -> Result<(), JErrorType> {
        let current = self.array_len(r).unwrap_or(0);
        if length > current {
            self.check_length(length)?;
            self.allocate((length - current) * SLOT_BYTES)?;
        }
        let mut released = 0;
        if let HeapCell::Array(elements) = &mut self.cells[r.0] {
            if length < current {
                released = elements[length..].iter().map(Heap::value_size).sum();
            }
            elements.resize(length, JsValue::Undefined);
        }
        self.release(released);
        Ok(())
    }

    pub fn object_set(&mut self, r: HeapRef, key: String, value: JsValue) -> Result<(), JErrorType> {
        let (old_bytes, length) = match &self.cells[r.0] {
            HeapCell::Object(data) => (data.get(&key).map(Heap::value_size), data.len() + 1),
            HeapCell::Array(_) => return Ok(()),
        };
        match old_bytes {
            Some(old_bytes) => self.replace(old_bytes, Heap::value_size(&value))?,
            None => {
                self.check_length(length)?;
                self.allocate(key.len() + Heap::value_size(&value))?;
            }
        }
        if let HeapCell::Object(data) = &mut self.cells[r.0] {
            data.insert(key, value);
        }
        Ok(())
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(HeapConfig::default())
    }
}
