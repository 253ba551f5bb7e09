//! PageRank over the call graph
//!
//! Power iteration with uniform weights over outgoing `Calls` edges.
//! Dangling nodes redistribute their mass uniformly, so the score vector
//! keeps summing to one.

use arbor_core::{CancelToken, CodeGraph, Error, NodeIdx};

use crate::util::{calls_in, calls_out};

pub const DEFAULT_DAMPING: f64 = 0.85;
pub const DEFAULT_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedNode {
    pub node: NodeIdx,
    pub score: f64,
    /// Simple structural score for comparison: `in-degree * 2 + out-degree`.
    pub degree_score: u32,
}

#[derive(Debug, Clone)]
pub struct PageRankResult {
    /// Nodes by score descending, ties by symbol id ascending.
    pub ranked: Vec<RankedNode>,
    pub iterations: usize,
    pub converged: bool,
}

/// Power iteration until the L1 delta drops under `tolerance` or
/// `max_iterations` is reached.
pub fn pagerank(
    g: &CodeGraph,
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
    cancel: &CancelToken,
) -> Result<PageRankResult, Error> {
    let n = g.node_count();
    if n == 0 {
        return Ok(PageRankResult {
            ranked: Vec::new(),
            iterations: 0,
            converged: true,
        });
    }

    let out = calls_out(g);
    let inn = calls_in(g);
    let out_degree: Vec<usize> = out.iter().map(Vec::len).collect();

    let base = (1.0 - damping) / n as f64;
    let mut scores = vec![1.0 / n as f64; n];
    let mut next = vec![0.0; n];
    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < max_iterations {
        cancel.checkpoint()?;
        iterations += 1;

        let dangling: f64 = (0..n)
            .filter(|&v| out_degree[v] == 0)
            .map(|v| scores[v])
            .sum();
        let dangling_share = damping * dangling / n as f64;

        for v in 0..n {
            let mut score = base + dangling_share;
            for &p in &inn[v] {
                let p = p as usize;
                if out_degree[p] > 0 {
                    score += damping * scores[p] / out_degree[p] as f64;
                }
            }
            next[v] = score;
        }

        let delta: f64 = scores
            .iter()
            .zip(next.iter())
            .map(|(old, new)| (old - new).abs())
            .sum();
        std::mem::swap(&mut scores, &mut next);

        if delta < tolerance {
            converged = true;
            break;
        }
    }

    let mut ranked: Vec<RankedNode> = (0..n)
        .map(|v| RankedNode {
            node: NodeIdx(v as u32),
            score: scores[v],
            degree_score: (inn[v].len() * 2 + out[v].len()) as u32,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| g.symbol(a.node).id.cmp(&g.symbol(b.node).id))
    });

    tracing::debug!(iterations, converged, "pagerank complete");
    Ok(PageRankResult {
        ranked,
        iterations,
        converged,
    })
}
