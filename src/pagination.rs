//! Pagination utilities.
//!
//! Pages are a presentation unit measured in words and are independent of
//! segment boundaries. Everything here is derived from per-segment word
//! counts on demand; there is no running counter that could drift.

/// Where a page jump lands: the segment containing the first word of the
/// page and that word's offset inside the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTarget {
    pub page: usize,
    pub segment_index: usize,
    pub word_offset: usize,
}

/// Current page and page count, both 1-based for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageState {
    pub current_page: usize,
    pub total_pages: usize,
}

pub fn total_words(word_counts: &[usize]) -> usize {
    word_counts.iter().sum()
}

/// `ceil(total words / words_per_page)`.
pub fn total_pages(word_counts: &[usize], words_per_page: usize) -> usize {
    total_words(word_counts).div_ceil(words_per_page.max(1))
}

/// Page containing the highlighted word of the active segment.
///
/// Counts every word of the segments before `active`, plus the highlighted
/// word offset (a missing highlight counts as the first word), 1-based.
pub fn current_page(
    word_counts: &[usize],
    active: usize,
    highlighted_word: Option<usize>,
    words_per_page: usize,
) -> usize {
    let before: usize = word_counts.iter().take(active).sum();
    let consumed = before + highlighted_word.unwrap_or(0) + 1;
    let page = consumed.div_ceil(words_per_page.max(1));
    page.min(total_pages(word_counts, words_per_page).max(1))
}

pub fn page_state(
    word_counts: &[usize],
    active: usize,
    highlighted_word: Option<usize>,
    words_per_page: usize,
) -> PageState {
    PageState {
        current_page: current_page(word_counts, active, highlighted_word, words_per_page),
        total_pages: total_pages(word_counts, words_per_page),
    }
}

/// Resolve a requested page to the segment holding its first word.
///
/// `page` is clamped to `1..=total_pages`. The target is the earliest segment
/// whose inclusive cumulative word count passes `(page - 1) * words_per_page`,
/// so segments without words are skipped. Returns `None` only when there are
/// no segments at all.
pub fn jump_target(word_counts: &[usize], page: usize, words_per_page: usize) -> Option<PageTarget> {
    if word_counts.is_empty() {
        return None;
    }
    let words_per_page = words_per_page.max(1);
    let page = page.clamp(1, total_pages(word_counts, words_per_page).max(1));
    let first_word = (page - 1) * words_per_page;

    let mut cumulative = 0usize;
    for (segment_index, count) in word_counts.iter().enumerate() {
        if cumulative + count > first_word {
            return Some(PageTarget {
                page,
                segment_index,
                word_offset: first_word - cumulative,
            });
        }
        cumulative += count;
    }

    // Only reachable when the document has no words.
    Some(PageTarget {
        page,
        segment_index: 0,
        word_offset: 0,
    })
}
