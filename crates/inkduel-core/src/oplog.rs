//! Ordered operation log for one drawing surface.

use crate::geometry::{EraserRule, hit_stroke};
use crate::operation::{ErasePayload, Operation};
use crate::stroke::Stroke;

/// Operations applied to a surface, in arrival order, and the strokes they yield.
#[derive(Debug, Clone, Default)]
pub struct OpLog {
    operations: Vec<Operation>,
    strokes: Vec<Stroke>,
    eraser: EraserRule,
}

impl OpLog {
    pub fn new(eraser: EraserRule) -> Self {
        Self {
            operations: Vec::new(),
            strokes: Vec::new(),
            eraser,
        }
    }

    /// Reset to empty and replay `operations` in order.
    pub fn rebuild<I>(&mut self, operations: I) -> &[Stroke]
    where
        I: IntoIterator<Item = Operation>,
    {
        self.operations.clear();
        self.strokes.clear();
        for op in operations {
            self.apply_one(op);
        }
        &self.strokes
    }

    /// Apply a single operation on top of the current strokes.
    pub fn apply_one(&mut self, op: Operation) -> &[Stroke] {
        if !op.is_well_formed() {
            log::debug!("Skipping malformed {} operation", op.kind().as_str());
            return &self.strokes;
        }
        match &op {
            Operation::Clear => self.strokes.clear(),
            Operation::Line(_) | Operation::Circle(_) => {
                if let Some(stroke) = Stroke::from_operation(&op) {
                    self.strokes.push(stroke);
                }
            }
            Operation::Erase(erase) => self.erase(erase),
        }
        self.operations.push(op);
        &self.strokes
    }

    fn erase(&mut self, erase: &ErasePayload) {
        let radius = self.eraser.radius(erase.width);
        for point in &erase.points {
            self.strokes.retain(|stroke| !hit_stroke(stroke, *point, radius));
        }
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn eraser(&self) -> EraserRule {
        self.eraser
    }
}
