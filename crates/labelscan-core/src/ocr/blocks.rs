//! Spatial clustering of text boxes into semantic blocks.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::models::config::BlockConfig;

use super::{SemanticBlock, TextBox};

/// Groups text boxes whose centers lie within a fixed radius of each other.
///
/// Clusters are the connected components of the "distance <= eps" graph over
/// box centers, so an isolated box forms its own block and every box ends up
/// in exactly one block.
#[derive(Debug, Clone, Default)]
pub struct SemanticBlockBuilder {
    config: BlockConfig,
}

impl SemanticBlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: BlockConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the neighborhood radius as a fraction of image height.
    pub fn with_eps_ratio(mut self, eps_ratio: f32) -> Self {
        self.config.eps_ratio = eps_ratio;
        self
    }

    /// Cluster boxes and return blocks in reading order.
    pub fn build_blocks(&self, text_boxes: Vec<TextBox>, image_height: u32) -> Vec<SemanticBlock> {
        if text_boxes.is_empty() {
            return Vec::new();
        }

        let box_count = text_boxes.len();
        let eps = image_height as f32 * self.config.eps_ratio;
        let clusters = cluster_centers(&text_boxes, eps);
        debug!("Clustered {} boxes into {} groups (eps {:.1})", box_count, clusters.len(), eps);

        let mut slots: Vec<Option<TextBox>> = text_boxes.into_iter().map(Some).collect();
        let mut blocks: Vec<SemanticBlock> = clusters
            .into_iter()
            .map(|members| {
                let boxes = members.into_iter().filter_map(|i| slots[i].take()).collect();
                SemanticBlock::new(boxes, self.config.in_block_row_height)
            })
            .collect();

        let row_height = image_height as f32 * self.config.row_ratio;
        let row_height = if row_height > 0.0 { row_height } else { 1.0 };
        blocks.sort_by(|a, b| reading_order(a, b, row_height));

        info!("Built {} semantic blocks from {} text boxes", blocks.len(), box_count);

        blocks
    }
}

/// Row bucket and x position used to order blocks.
pub(crate) fn reading_key(block: &SemanticBlock, row_height: f32) -> (i64, f32) {
    let (x, y) = block.top_left();
    ((y / row_height).floor() as i64, x)
}

fn reading_order(a: &SemanticBlock, b: &SemanticBlock, row_height: f32) -> Ordering {
    let (row_a, x_a) = reading_key(a, row_height);
    let (row_b, x_b) = reading_key(b, row_height);
    row_a
        .cmp(&row_b)
        .then_with(|| x_a.partial_cmp(&x_b).unwrap_or(Ordering::Equal))
}

/// Breadth-first expansion over box centers; returns member indices per cluster.
fn cluster_centers(boxes: &[TextBox], eps: f32) -> Vec<Vec<usize>> {
    let centers: Vec<(f32, f32)> = boxes.iter().map(|b| b.center()).collect();
    let mut visited = vec![false; centers.len()];
    let mut clusters = Vec::new();

    for start in 0..centers.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;

        let mut cluster = vec![start];
        let mut next = 0;
        while next < cluster.len() {
            let (cx, cy) = centers[cluster[next]];
            for (k, &(x, y)) in centers.iter().enumerate() {
                if visited[k] {
                    continue;
                }
                let distance = ((cx - x).powi(2) + (cy - y).powi(2)).sqrt();
                if distance <= eps {
                    visited[k] = true;
                    cluster.push(k);
                }
            }
            next += 1;
        }

        clusters.push(cluster);
    }

    clusters
}
