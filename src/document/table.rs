use serde::{Deserialize, Serialize};

use crate::document::form_box::FormBox;

/// Interior ruling lines of a table, in the table's own coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableGrid {
    /// x of each vertical line, ascending
    pub columns: Vec<i32>,
    /// y of each horizontal line, ascending
    pub rows: Vec<i32>,
}

/// Which horizontal line the value rows of a table start below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowAnchor {
    LastLine,
    SecondToLastLine,
}

impl TableGrid {
    pub fn new(mut columns: Vec<i32>, mut rows: Vec<i32>) -> Self {
        columns.sort_unstable();
        rows.sort_unstable();
        Self { columns, rows }
    }

    pub fn anchor_y(&self, anchor: RowAnchor) -> Option<i32> {
        match anchor {
            RowAnchor::LastLine => self.rows.last().copied(),
            RowAnchor::SecondToLastLine => self
                .rows
                .len()
                .checked_sub(2)
                .and_then(|i| self.rows.get(i))
                .copied(),
        }
    }

    /// The cells between vertical lines `left` and `right`, from the anchor
    /// line down to the bottom of the table, in page coordinates.
    pub fn column_below(
        &self,
        table: &FormBox,
        left: usize,
        right: usize,
        anchor: RowAnchor,
    ) -> Option<FormBox> {
        let x0 = *self.columns.get(left)?;
        let x1 = *self.columns.get(right)?;
        let y = self.anchor_y(anchor)?;
        if x1 <= x0 || y >= table.height {
            return None;
        }

        Some(FormBox::new(
            table.x + x0,
            table.y + y,
            x1 - x0,
            table.height - y,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_below_last_line() {
        let grid = TableGrid::new(vec![40, 10, 90], vec![5, 30, 60]);
        let table = FormBox::new(100, 200, 120, 150);

        let column = grid.column_below(&table, 0, 1, RowAnchor::LastLine).unwrap();
        assert_eq!(column, FormBox::new(110, 260, 30, 90));

        let column = grid
            .column_below(&table, 1, 2, RowAnchor::SecondToLastLine)
            .unwrap();
        assert_eq!(column, FormBox::new(140, 230, 50, 120));
    }

    #[test]
    fn test_column_below_missing_line() {
        let grid = TableGrid::new(vec![10], vec![5]);
        let table = FormBox::new(0, 0, 100, 100);
        assert!(grid.column_below(&table, 0, 1, RowAnchor::LastLine).is_none());
        assert!(grid.anchor_y(RowAnchor::SecondToLastLine).is_none());
    }
}
