use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoordError, Result};

/// Argumento de una tarea: un valor fijo o una secuencia a recorrer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskArg {
    Literal(Value),
    Sequence(Vec<Value>),
}

impl TaskArg {
    pub fn literal(v: impl Into<Value>) -> Self {
        TaskArg::Literal(v.into())
    }

    pub fn sequence<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        TaskArg::Sequence(items.into_iter().map(Into::into).collect())
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, TaskArg::Sequence(_))
    }
}

/// Una función más sus argumentos. Sólo se aplana un nivel.
pub struct Task<F> {
    pub func: F,
    pub args: Vec<TaskArg>,
}

impl<F> Task<F> {
    pub fn new(func: F, args: Vec<TaskArg>) -> Self {
        Self { func, args }
    }

    pub fn has_sequences(&self) -> bool {
        self.args.iter().any(TaskArg::is_sequence)
    }

    pub fn space(&self) -> Result<IterationSpace<'_>> {
        IterationSpace::new(&self.args)
    }

    /// Argumentos tal cual, para el caso sin secuencias.
    pub fn literal_args(&self) -> Vec<Value> {
        self.args
            .iter()
            .map(|a| match a {
                TaskArg::Literal(v) => v.clone(),
                TaskArg::Sequence(items) => Value::Array(items.clone()),
            })
            .collect()
    }
}

/// Producto cartesiano de los argumentos-secuencia, aplanado a un índice
/// 0-based. El argumento de más a la derecha varía más rápido.
pub struct IterationSpace<'a> {
    args: &'a [TaskArg],
    len: usize,
}

impl<'a> IterationSpace<'a> {
    /// Falla si el producto de los largos no entra en un `usize`.
    pub fn new(args: &'a [TaskArg]) -> Result<Self> {
        let lens: Vec<usize> = args
            .iter()
            .filter_map(|a| match a {
                TaskArg::Sequence(items) => Some(items.len()),
                TaskArg::Literal(_) => None,
            })
            .collect();

        // una secuencia vacía deja el espacio vacío aunque el resto desborde
        if lens.contains(&0) {
            return Ok(Self { args, len: 0 });
        }

        let len = lens
            .into_iter()
            .try_fold(1usize, |acc, n| acc.checked_mul(n))
            .ok_or_else(|| {
                CoordError::config("el producto de las secuencias no entra en un usize")
            })?;
        Ok(Self { args, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Argumentos concretos para la posición `position`.
    pub fn args_at(&self, position: usize) -> Vec<Value> {
        debug_assert!(position < self.len);

        let mut out = vec![Value::Null; self.args.len()];
        let mut rest = position;

        // de derecha a izquierda, como dígitos en base mixta
        for (slot, arg) in self.args.iter().enumerate().rev() {
            out[slot] = match arg {
                TaskArg::Literal(v) => v.clone(),
                TaskArg::Sequence(items) => {
                    let v = items[rest % items.len()].clone();
                    rest /= items.len();
                    v
                }
            };
        }
        out
    }
}
