use crate::models::{Course, CourseChunk, Lesson};
use lectern_core::{LecternError, LecternResult};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// File extensions accepted by folder ingestion.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

#[allow(clippy::expect_used)]
fn lesson_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^lesson\s+(\d+)\s*:\s*(.*)$").expect("lesson marker regex"))
}

fn header_field<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    if key.trim().eq_ignore_ascii_case(label) {
        let value = value.trim();
        (!value.is_empty()).then_some(value)
    } else {
        None
    }
}

/// Parses course files and splits their text into overlapping chunks.
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    chunk_size: usize,
    chunk_overlap: usize,
}

struct LessonSection {
    lesson: Lesson,
    body: Vec<String>,
}

impl DocumentProcessor {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
        }
    }

    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
    }

    /// Read and parse a course file. The file stem is the fallback title.
    pub async fn process_file(&self, path: &Path) -> LecternResult<(Course, Vec<CourseChunk>)> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            LecternError::Document(format!("Failed to read {}: {e}", path.display()))
        })?;
        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        self.parse(&text, fallback)
    }

    /// Parse course text into its catalog entry and content chunks.
    pub fn parse(
        &self,
        text: &str,
        fallback_title: &str,
    ) -> LecternResult<(Course, Vec<CourseChunk>)> {
        let mut title = None;
        let mut course_link = None;
        let mut instructor = None;
        let mut preamble: Vec<String> = Vec::new();
        let mut sections: Vec<LessonSection> = Vec::new();

        for line in text.lines() {
            if let Some(caps) = lesson_marker().captures(line.trim()) {
                let lesson_number = caps[1].parse::<u32>().map_err(|e| {
                    LecternError::Document(format!("Bad lesson number '{}': {e}", &caps[1]))
                })?;
                sections.push(LessonSection {
                    lesson: Lesson {
                        lesson_number,
                        title: caps[2].trim().to_string(),
                        lesson_link: None,
                    },
                    body: Vec::new(),
                });
                continue;
            }

            match sections.last_mut() {
                Some(section) => {
                    let at_top = section.body.iter().all(|l| l.trim().is_empty());
                    if section.lesson.lesson_link.is_none() && at_top {
                        if let Some(link) = header_field(line, "lesson link") {
                            section.lesson.lesson_link = Some(link.to_string());
                            continue;
                        }
                    }
                    section.body.push(line.to_string());
                }
                None => {
                    if title.is_none() {
                        if let Some(v) = header_field(line, "course title") {
                            title = Some(v.to_string());
                            continue;
                        }
                    }
                    if course_link.is_none() {
                        if let Some(v) = header_field(line, "course link") {
                            course_link = Some(v.to_string());
                            continue;
                        }
                    }
                    if instructor.is_none() {
                        if let Some(v) = header_field(line, "course instructor") {
                            instructor = Some(v.to_string());
                            continue;
                        }
                    }
                    preamble.push(line.to_string());
                }
            }
        }

        let title = title
            .or_else(|| {
                let fallback = fallback_title.trim();
                (!fallback.is_empty()).then(|| fallback.to_string())
            })
            .ok_or_else(|| LecternError::Document("Course has no title".into()))?;

        let mut chunks = Vec::new();
        if sections.is_empty() {
            for body in self.chunk_text(&preamble.join("\n")) {
                chunks.push(self.make_chunk(&title, None, chunks.len(), &body));
            }
        } else {
            for section in &sections {
                let number = section.lesson.lesson_number;
                for body in self.chunk_text(&section.body.join("\n")) {
                    chunks.push(self.make_chunk(&title, Some(number), chunks.len(), &body));
                }
            }
        }

        let course = Course {
            title,
            course_link,
            instructor,
            lessons: sections.into_iter().map(|s| s.lesson).collect(),
        };
        debug!(
            course = %course.title,
            lessons = course.lessons.len(),
            chunks = chunks.len(),
            "Parsed course document"
        );
        Ok((course, chunks))
    }

    fn make_chunk(
        &self,
        title: &str,
        lesson: Option<u32>,
        index: usize,
        body: &str,
    ) -> CourseChunk {
        let content = match lesson {
            Some(n) => format!("Course {title} Lesson {n} content: {body}"),
            None => format!("Course {title} content: {body}"),
        };
        CourseChunk {
            content,
            course_title: title.to_string(),
            lesson_number: lesson,
            chunk_index: index,
        }
    }

    /// Split text into chunks of at most `chunk_size` characters, each chunk
    /// made of whole sentences. Consecutive chunks share trailing sentences
    /// totalling at most `chunk_overlap` characters.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let sentences = split_sentences(&normalized);
        let lens: Vec<usize> = sentences.iter().map(|s| s.chars().count()).collect();

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < sentences.len() {
            let mut end = start;
            let mut size = 0;
            while end < sentences.len() {
                let added = lens[end] + usize::from(end > start);
                if end > start && size + added > self.chunk_size {
                    break;
                }
                size += added;
                end += 1;
            }
            chunks.push(sentences[start..end].join(" "));
            if end == sentences.len() {
                break;
            }

            let mut overlap_size = 0;
            let mut overlap = 0;
            for k in (start..end).rev() {
                let added = lens[k] + usize::from(overlap > 0);
                if overlap_size + added > self.chunk_overlap {
                    break;
                }
                overlap_size += added;
                overlap += 1;
            }
            start = (end - overlap).max(start + 1);
        }
        chunks
    }
}

const ABBREVIATIONS: &[&str] = &["e.g", "i.e", "etc", "vs", "mr", "mrs", "dr", "prof"];

/// Sentence boundaries are `.`, `!` or `?` followed by a space and an
/// uppercase letter or digit, except after common abbreviations.
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        current.push(c);
        let boundary = matches!(c, '.' | '!' | '?')
            && chars.get(i + 1) == Some(&' ')
            && chars
                .get(i + 2)
                .is_some_and(|n| n.is_uppercase() || n.is_ascii_digit())
            && !ends_with_abbreviation(&current);
        if boundary {
            sentences.push(current.trim().to_string());
            current.clear();
            i += 1;
        }
        i += 1;
    }
    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

fn ends_with_abbreviation(sentence: &str) -> bool {
    let last_word = sentence
        .trim_end_matches('.')
        .rsplit(' ')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    ABBREVIATIONS.contains(&last_word.as_str())
}
