use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coordinator::Coordinator;
use crate::error::{CoordError, Result};
use crate::kvs::Kvs;

/// Rango semiabierto `[lower, upper)` reclamado por un proceso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRange {
    pub lower: usize,
    pub upper: usize,
}

impl WorkRange {
    pub fn contains(&self, position: usize) -> bool {
        self.lower <= position && position < self.upper
    }

    pub fn len(&self) -> usize {
        self.upper - self.lower
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reparte posiciones 0, 1, 2, ... entre procesos usando un contador en el KVS.
///
/// Cada reclamo es `get` del contador (`lower`) seguido de `put(lower + chunk)`.
/// Como el KVS entrega cada valor a un solo `get`, el par se comporta como
/// un fetch-and-add atómico.
pub struct RangeAllocator<'a, K> {
    coord: &'a Coordinator<K>,
    key: String,
    chunk: usize,
    range: Option<WorkRange>,
    cursor: usize,
}

impl<'a, K: Kvs> RangeAllocator<'a, K> {
    /// Arranca un asignador sobre `key`. Sólo el master publica el 0 inicial.
    pub async fn start(coord: &'a Coordinator<K>, key: &str, chunk: usize) -> Result<Self> {
        if chunk < 1 {
            return Err(CoordError::config(format!(
                "chunk debe ser >= 1 (llegó {})",
                chunk
            )));
        }

        if coord.is_master() {
            coord.put_key(key, &0usize).await?;
        }

        Ok(Self {
            coord,
            key: key.to_string(),
            chunk,
            range: None,
            cursor: 0,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn chunk(&self) -> usize {
        self.chunk
    }

    /// Rango que tiene este proceso ahora mismo.
    pub fn current_range(&self) -> Option<WorkRange> {
        self.range
    }

    /// Decide si `position` es de este proceso, reclamando un rango nuevo
    /// cuando la posición ya pasó el límite superior del actual.
    pub async fn claim_if_needed(&mut self, position: usize) -> Result<bool> {
        let needs_claim = match self.range {
            None => true,
            Some(r) => position >= r.upper,
        };

        if needs_claim {
            let lower: usize = self.coord.get_key(&self.key).await?;
            let Some(upper) = lower.checked_add(self.chunk) else {
                // devolver el contador para que los demás no queden colgados
                self.coord.put_key(&self.key, &lower).await?;
                return Err(CoordError::config(format!(
                    "el contador {} se desborda: {} + chunk {}",
                    self.key, lower, self.chunk
                )));
            };
            self.coord.put_key(&self.key, &upper).await?;

            let range = WorkRange { lower, upper };
            debug!(
                "rank {} reclamó [{}, {}) en {}",
                self.coord.rank(),
                lower,
                upper,
                self.key
            );
            self.range = Some(range);
        }

        Ok(self.range.map(|r| r.contains(position)).unwrap_or(false))
    }

    /// Versión secuencial: decide la siguiente posición (0, 1, 2, ...).
    pub async fn next(&mut self) -> Result<bool> {
        let position = self.cursor;
        self.cursor += 1;
        self.claim_if_needed(position).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKvs;
    use crate::topology::Topology;
    use std::collections::BTreeSet;

    fn coords(kvs: &MemoryKvs, n: usize) -> Vec<Coordinator<MemoryKvs>> {
        (0..n)
            .map(|rank| Coordinator::new(kvs.clone(), Topology::for_rank(rank, n)))
            .collect()
    }

    #[tokio::test]
    async fn chunk_cero_es_error_de_config() {
        let coord = Coordinator::new(MemoryKvs::new(), Topology::single());
        let res = coord.own_check("count", 0).await;
        assert!(matches!(res, Err(CoordError::Config { .. })));
    }

    #[tokio::test]
    async fn chunk_enorme_no_desborda_el_contador() {
        let kvs = MemoryKvs::new();
        let cs = coords(&kvs, 2);
        let mut w0 = cs[0].own_check("count", usize::MAX).await.unwrap();
        let mut w1 = cs[1].own_check("count", usize::MAX).await.unwrap();

        assert!(w0.next().await.unwrap());
        assert_eq!(
            w0.current_range(),
            Some(WorkRange {
                lower: 0,
                upper: usize::MAX
            })
        );

        let err = w1.next().await.unwrap_err();
        assert!(matches!(err, CoordError::Config { .. }));

        // el contador sigue publicado con el valor que tenía
        assert_eq!(kvs.len("count"), 1);
        let left: usize = cs[0].view_key("count").await.unwrap();
        assert_eq!(left, usize::MAX);
    }

    /// 2 workers, chunk 3, 8 posiciones, reclamos en orden de rank.
    #[tokio::test]
    async fn escenario_dos_workers_chunk_tres() {
        let kvs = MemoryKvs::new();
        let cs = coords(&kvs, 2);
        let mut w0 = cs[0].own_check("count", 3).await.unwrap();
        let mut w1 = cs[1].own_check("count", 3).await.unwrap();

        let mut owner: Vec<Option<usize>> = vec![None; 8];
        let mut ranges0 = Vec::new();

        // w0 toma [0,3)
        for p in 0..3 {
            if w0.next().await.unwrap() {
                owner[p] = Some(0);
            }
        }
        ranges0.push(w0.current_range());
        // w1 toma [3,6)
        for p in 0..6 {
            if w1.next().await.unwrap() {
                owner[p] = Some(1);
            }
        }
        assert_eq!(w1.current_range(), Some(WorkRange { lower: 3, upper: 6 }));
        // w0 se queda sin rango en la posición 3 y toma [6,9)
        for p in 3..8 {
            if w0.next().await.unwrap() {
                owner[p] = Some(0);
            }
        }
        ranges0.push(w0.current_range());
        // w1 termina: reclama [9,12) y no le toca nada más
        for _ in 6..8 {
            assert!(!w1.next().await.unwrap());
        }

        assert_eq!(
            owner,
            vec![
                Some(0),
                Some(0),
                Some(0),
                Some(1),
                Some(1),
                Some(1),
                Some(0),
                Some(0)
            ]
        );
        assert_eq!(
            ranges0,
            vec![
                Some(WorkRange { lower: 0, upper: 3 }),
                Some(WorkRange { lower: 6, upper: 9 })
            ]
        );
        // queda un solo valor en el contador
        assert_eq!(kvs.len("count"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn particion_sin_huecos_ni_solapamientos() {
        for (n, chunk, total) in [(1, 1, 7), (3, 2, 20), (4, 5, 33), (5, 7, 3)] {
            let kvs = MemoryKvs::new();
            let mut handles = Vec::new();

            for rank in 0..n {
                let kvs = kvs.clone();
                handles.push(tokio::spawn(async move {
                    let coord = Coordinator::new(kvs, Topology::for_rank(rank, n));
                    let mut alloc = coord.own_check("count", chunk).await.unwrap();
                    let mut mine = Vec::new();
                    for p in 0..total {
                        if alloc.next().await.unwrap() {
                            mine.push(p);
                        }
                    }
                    mine
                }));
            }

            let mut seen = BTreeSet::new();
            let mut count = 0;
            for h in handles {
                for p in h.await.unwrap() {
                    seen.insert(p);
                    count += 1;
                }
            }

            assert_eq!(count, total, "n={} chunk={}", n, chunk);
            assert_eq!(seen, (0..total).collect::<BTreeSet<_>>());
        }
    }

    #[tokio::test]
    async fn claves_distintas_no_interfieren() {
        let kvs = MemoryKvs::new();
        let coord = Coordinator::new(kvs.clone(), Topology::single());

        let mut a = coord.own_check("a", 2).await.unwrap();
        let mut b = coord.own_check("b", 4).await.unwrap();

        assert!(a.next().await.unwrap());
        assert!(b.next().await.unwrap());
        assert_eq!(a.current_range(), Some(WorkRange { lower: 0, upper: 2 }));
        assert_eq!(b.current_range(), Some(WorkRange { lower: 0, upper: 4 }));
    }
}
