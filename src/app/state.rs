use ratatui::layout::Rect;
use unicode_segmentation::UnicodeSegmentation;

use crate::reorder::SlotBox;
use crate::store::ItemId;

/// Columns taken by the `" 12. "` index prefix of a row.
pub const INDEX_WIDTH: u16 = 5;
/// Columns taken by the `"[x]"` checkbox after the index.
pub const CHECKBOX_WIDTH: u16 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    NewItem,
    Reminder { id: ItemId, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub buffer: String,
}

impl Prompt {
    pub fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            buffer: String::new(),
        }
    }

    pub fn title(&self) -> String {
        match &self.kind {
            PromptKind::NewItem => "New item".to_string(),
            PromptKind::Reminder { text, .. } => format!("Remind me (HH:MM): {text}"),
        }
    }

    pub fn push_char(&mut self, ch: char) {
        self.buffer.push(ch);
    }

    /// Drops the last grapheme cluster.
    pub fn backspace(&mut self) -> bool {
        let Some((idx, _)) = self.buffer.grapheme_indices(true).next_back() else {
            return false;
        };
        self.buffer.truncate(idx);
        true
    }
}

/// Where a mouse press landed inside the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowHit {
    Surface(usize),
    Checkbox(usize),
}

#[derive(Debug, Default)]
pub struct AppState {
    selected: usize,
    prompt: Option<Prompt>,
    status: Option<String>,
    list_area: Rect,
    list_offset: usize,
}

impl AppState {
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select(&mut self, index: usize, len: usize) {
        self.selected = index;
        self.clamp_selection(len);
    }

    pub fn move_selection(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        let target = self.selected as isize + delta;
        self.selected = target.clamp(0, len as isize - 1) as usize;
    }

    pub fn clamp_selection(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    pub fn prompt_mut(&mut self) -> Option<&mut Prompt> {
        self.prompt.as_mut()
    }

    pub fn open_prompt(&mut self, kind: PromptKind) {
        self.prompt = Some(Prompt::new(kind));
    }

    pub fn close_prompt(&mut self) -> Option<Prompt> {
        self.prompt.take()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status = message.map(Into::into);
    }

    /// Remembers where the list body was drawn, for mouse hit testing.
    pub fn record_layout(&mut self, area: Rect, offset: usize) {
        self.list_area = area;
        self.list_offset = offset;
    }

    pub fn hit_test(&self, column: u16, row: u16, len: usize) -> Option<RowHit> {
        let area = self.list_area;
        if column < area.x
            || column >= area.x + area.width
            || row < area.y
            || row >= area.y + area.height
        {
            return None;
        }
        let index = self.list_offset + usize::from(row - area.y);
        if index >= len {
            return None;
        }
        let rel = column - area.x;
        if (INDEX_WIDTH..INDEX_WIDTH + CHECKBOX_WIDTH).contains(&rel) {
            Some(RowHit::Checkbox(index))
        } else {
            Some(RowHit::Surface(index))
        }
    }

    /// Geometry of the rows currently on screen, `drawn` being the ids in
    /// the order they were drawn. One terminal line per row.
    pub fn slots(&self, drawn: &[ItemId]) -> Vec<SlotBox> {
        let area = self.list_area;
        drawn
            .iter()
            .enumerate()
            .skip(self.list_offset)
            .take(usize::from(area.height))
            .map(|(idx, id)| {
                let top = f32::from(area.y) + (idx - self.list_offset) as f32;
                SlotBox::new(id.clone(), top, 1.0)
            })
            .collect()
    }

    /// Pointer position for a terminal row. A cell is a whole row, so rows
    /// at or above the dragged one map to their top edge and rows below it
    /// to their middle: the item then lands on the row it is dropped on.
    pub fn pointer_y(row: u16, slots: &[SlotBox], dragged: Option<&ItemId>) -> f32 {
        let y = f32::from(row);
        let dragged_top = dragged
            .and_then(|id| slots.iter().find(|slot| &slot.id == id))
            .map(|slot| slot.top);
        match dragged_top {
            Some(top) if y > top => y + 0.5,
            _ => y,
        }
    }
}
