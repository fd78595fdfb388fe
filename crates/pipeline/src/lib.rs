//! Maps the backend's coarse `processing_status` onto the fixed stage
//! timeline a source moves through, and keeps a user-navigable cursor over
//! that timeline.
//!
//! Everything here is a pure projection of `(status, cursor)`; nothing is
//! persisted per stage.

use core_types::SourceKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Upload,
    Queued,
    Partitioning,
    Chunking,
    Summarisation,
    Vectorization,
    ViewChunks,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 7] = [
        PipelineStage::Upload,
        PipelineStage::Queued,
        PipelineStage::Partitioning,
        PipelineStage::Chunking,
        PipelineStage::Summarisation,
        PipelineStage::Vectorization,
        PipelineStage::ViewChunks,
    ];

    /// Stage used for any status the client does not recognise.
    pub const FALLBACK: PipelineStage = PipelineStage::Queued;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Queued => "queued",
            Self::Partitioning => "partitioning",
            Self::Chunking => "chunking",
            Self::Summarisation => "summarisation",
            Self::Vectorization => "vectorization",
            Self::ViewChunks => "view",
        }
    }

    pub fn title(self, kind: SourceKind) -> &'static str {
        match self {
            Self::Upload => match kind {
                SourceKind::File => "Upload to S3",
                SourceKind::Url => "Source Added",
            },
            Self::Queued => "Queued",
            Self::Partitioning => "Partitioning",
            Self::Chunking => "Chunking",
            Self::Summarisation => "Summarisation",
            Self::Vectorization => "Vectorization & Storage",
            Self::ViewChunks => "View Chunks",
        }
    }

    pub fn description(self, kind: SourceKind) -> &'static str {
        match self {
            Self::Upload => match kind {
                SourceKind::File => "Uploading document to cloud storage",
                SourceKind::Url => "Website URL added to project",
            },
            Self::Queued => "Document is queued for processing",
            Self::Partitioning => "Processing and extracting text, images, and tables",
            Self::Chunking => "Breaking document into smaller chunks",
            Self::Summarisation => "Generating summaries for document chunks",
            Self::Vectorization => "Creating embeddings and storing vectors",
            Self::ViewChunks => "Browse and inspect document chunks",
        }
    }
}

/// Resolves a backend status string to its canonical stage.
///
/// Case-insensitive. Absent or blank statuses mean the source is still being
/// uploaded; anything unrecognised degrades to [`PipelineStage::FALLBACK`].
pub fn resolve_stage(processing_status: Option<&str>) -> PipelineStage {
    let Some(status) = processing_status.map(str::trim).filter(|s| !s.is_empty()) else {
        return PipelineStage::Upload;
    };
    match status.to_ascii_lowercase().as_str() {
        "uploading" => PipelineStage::Upload,
        "queued" => PipelineStage::Queued,
        "processing" | "partitioning" => PipelineStage::Partitioning,
        "chunking" => PipelineStage::Chunking,
        "summarising" | "summarization" => PipelineStage::Summarisation,
        "vectorizing" | "vectorization" => PipelineStage::Vectorization,
        "completed" | "complete" => PipelineStage::ViewChunks,
        _ => PipelineStage::FALLBACK,
    }
}

/// Whether the status marks the pipeline as finished.
pub fn is_terminal_status(processing_status: Option<&str>) -> bool {
    processing_status
        .map(|status| status.trim().to_ascii_lowercase())
        .is_some_and(|status| status == "completed" || status == "complete")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Processing,
    Pending,
}

/// Status of `stage` for a source whose resolved stage is `current`.
pub fn stage_status(stage: PipelineStage, current: PipelineStage, terminal: bool) -> StageStatus {
    match stage.index().cmp(&current.index()) {
        std::cmp::Ordering::Less => StageStatus::Completed,
        std::cmp::Ordering::Equal if terminal => StageStatus::Completed,
        std::cmp::Ordering::Equal => StageStatus::Processing,
        std::cmp::Ordering::Greater => StageStatus::Pending,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimelineEntry {
    pub stage: PipelineStage,
    pub title: &'static str,
    pub status: StageStatus,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StageView {
    pub stage: PipelineStage,
    pub title: &'static str,
    pub description: &'static str,
    pub status: StageStatus,
}

/// Timeline of one source plus the stage the user is looking at.
///
/// Moving the cursor never touches the resolved stage and never issues a
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    kind: SourceKind,
    current: PipelineStage,
    terminal: bool,
    cursor: PipelineStage,
}

impl Timeline {
    /// Opens the timeline with the cursor on the resolved stage.
    pub fn open(kind: SourceKind, processing_status: Option<&str>) -> Self {
        let current = resolve_stage(processing_status);
        Self {
            kind,
            current,
            terminal: is_terminal_status(processing_status),
            cursor: current,
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.current
    }

    pub fn cursor(&self) -> PipelineStage {
        self.cursor
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn select(&mut self, stage: PipelineStage) {
        self.cursor = stage;
    }

    pub fn select_next(&mut self) -> PipelineStage {
        if let Some(next) = PipelineStage::from_index(self.cursor.index() + 1) {
            self.cursor = next;
        }
        self.cursor
    }

    pub fn select_previous(&mut self) -> PipelineStage {
        if let Some(previous) = self
            .cursor
            .index()
            .checked_sub(1)
            .and_then(PipelineStage::from_index)
        {
            self.cursor = previous;
        }
        self.cursor
    }

    /// A URL source is registered before it is queued, so its first stage
    /// always shows as completed.
    pub fn status_of(&self, stage: PipelineStage) -> StageStatus {
        if self.kind == SourceKind::Url && stage == PipelineStage::Upload {
            return StageStatus::Completed;
        }
        stage_status(stage, self.current, self.terminal)
    }

    pub fn entries(&self) -> Vec<TimelineEntry> {
        PipelineStage::ALL
            .iter()
            .map(|&stage| TimelineEntry {
                stage,
                title: stage.title(self.kind),
                status: self.status_of(stage),
                selected: stage == self.cursor,
            })
            .collect()
    }

    pub fn selected_view(&self) -> StageView {
        StageView {
            stage: self.cursor,
            title: self.cursor.title(self.kind),
            description: self.cursor.description(self.kind),
            status: self.status_of(self.cursor),
        }
    }
}
