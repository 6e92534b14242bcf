//! Query-string assembly for optional API arguments.
//!
//! Absent arguments are dropped entirely, list values expand to repeated
//! `key=value` pairs, and insertion order is preserved so that identical
//! calls always produce identical query strings.

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<ParamValue>),
}

impl ParamValue {
    fn push_pairs(&self, name: &str, out: &mut Vec<(String, String)>) {
        match self {
            ParamValue::List(items) => {
                for item in items {
                    item.push_pairs(name, out);
                }
            }
            scalar => out.push((name.to_string(), scalar.render())),
        }
    }

    fn render(&self) -> String {
        match self {
            ParamValue::Text(s) => s.clone(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::List(items) => items
                .iter()
                .map(ParamValue::render)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    fn is_empty_list(&self) -> bool {
        matches!(self, ParamValue::List(items) if items.is_empty())
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Text(value.clone())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

macro_rules! int_param {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ParamValue {
                fn from(value: $t) -> Self {
                    i64::try_from(value)
                        .map(ParamValue::Int)
                        .unwrap_or_else(|_| ParamValue::Text(value.to_string()))
                }
            }
        )*
    };
}

int_param!(i32, i64, u16, u32, u64, usize);

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Ordered set of query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds parameters from `(remote name, value)` pairs, skipping absent values.
    pub fn build<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Option<ParamValue>)>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |params, (name, value)| params.opt(name, value))
    }

    /// Adds a parameter that is always present.
    pub fn set(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.push(name, value.into());
        self
    }

    /// Adds a parameter only when a value was supplied.
    pub fn opt<V: Into<ParamValue>>(mut self, name: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.push(name, value.into());
        }
        self
    }

    /// Adds a multi-valued parameter; an empty list is treated as absent.
    pub fn list<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        let value = ParamValue::List(values.into_iter().map(Into::into).collect());
        self.push(name, value);
        self
    }

    fn push(&mut self, name: &str, value: ParamValue) {
        if value.is_empty_list() {
            return;
        }
        self.entries.push((name.to_string(), value));
    }

    /// Appends every parameter of `other` after the existing ones.
    pub fn merge(mut self, other: Params) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Flattens into ordered query pairs, expanding lists into repeated keys.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            value.push_pairs(name, &mut out);
        }
        out
    }
}
