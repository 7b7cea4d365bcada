//! Free-text section classification
//!
//! Postings arrive as one block of text. This module splits it into the six
//! canonical sections by watching for heading lines. A heading moves the
//! cursor and stays in the section it opens; every other line goes to the
//! section the cursor is on. The function is pure, so classifying
//! `raw_content` again always yields the same sections.

use crate::model::DetailSections;
use regex::Regex;
use std::sync::OnceLock;

/// Section a line can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Intro,
    MainTasks,
    Requirements,
    PreferredPoints,
    Benefits,
    WorkConditions,
}

/// Heading phrases per group, in precedence order
///
/// The last group holds procedural headings and is folded into work conditions.
const HEADING_GROUPS: &[(Section, &[&str])] = &[
    (
        Section::MainTasks,
        &[
            "담당업무",
            "담당 업무",
            "주요업무",
            "주요 업무",
            "업무내용",
            "업무 내용",
            "직무내용",
            "직무 내용",
            "하는 일",
            "이런 일을 해요",
        ],
    ),
    (
        Section::Requirements,
        &[
            "자격요건",
            "자격 요건",
            "필수요건",
            "필수 요건",
            "지원자격",
            "지원 자격",
            "필요역량",
            "필요 역량",
            "이런 분을 찾아요",
        ],
    ),
    (
        Section::PreferredPoints,
        &[
            "우대사항",
            "우대 사항",
            "우대요건",
            "우대 요건",
            "우대조건",
            "우대 조건",
            "이런 분이면 더 좋아요",
        ],
    ),
    (
        Section::Benefits,
        &["복리후생", "복지", "혜택", "이런 혜택을 드려요"],
    ),
    (
        Section::WorkConditions,
        &[
            "근무조건",
            "근무 조건",
            "근무환경",
            "근무 환경",
            "근무형태",
            "근무 형태",
            "근무지",
            "근무시간",
            "근무 시간",
            "급여",
        ],
    ),
    (
        Section::WorkConditions,
        &[
            "제출서류",
            "제출 서류",
            "전형절차",
            "전형 절차",
            "채용절차",
            "채용 절차",
            "지원방법",
            "지원 방법",
            "접수방법",
            "접수 방법",
            "유의사항",
            "기타사항",
            "기타 사항",
        ],
    ),
];

/// Decoration allowed in front of a heading phrase: bullets, brackets, numbering
const HEADING_PREFIX: &str = r"^[\s\[\(【<〈「『■□●○◆◇▶▷▣◼•·※#*\-=✔✅📌\x{FE0F}0-9.)]*";

static HEADING_RES: OnceLock<Vec<(Section, Regex)>> = OnceLock::new();
static BLANK_RUN_RE: OnceLock<Regex> = OnceLock::new();

fn heading_regexes() -> &'static [(Section, Regex)] {
    HEADING_RES.get_or_init(|| {
        HEADING_GROUPS
            .iter()
            .map(|(section, phrases)| {
                let alternatives: Vec<String> =
                    phrases.iter().map(|p| regex::escape(p)).collect();
                let pattern = format!("{}(?:{})", HEADING_PREFIX, alternatives.join("|"));
                (*section, Regex::new(&pattern).unwrap())
            })
            .collect()
    })
}

fn blank_run_regex() -> &'static Regex {
    BLANK_RUN_RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

/// Returns the section a heading line opens, if the line is a heading
///
/// Groups are tested in declaration order; the first match wins.
pub fn match_heading(line: &str) -> Option<Section> {
    heading_regexes()
        .iter()
        .find(|(_, re)| re.is_match(line))
        .map(|(section, _)| *section)
}

/// Collapses runs of three or more newlines to two and trims the result
fn tidy(text: &str) -> String {
    blank_run_regex().replace_all(text, "\n\n").trim().to_string()
}

#[derive(Default)]
struct SectionBuffers {
    intro: String,
    main_tasks: String,
    requirements: String,
    preferred_points: String,
    benefits: String,
    work_conditions: String,
}

impl SectionBuffers {
    fn get_mut(&mut self, section: Section) -> &mut String {
        match section {
            Section::Intro => &mut self.intro,
            Section::MainTasks => &mut self.main_tasks,
            Section::Requirements => &mut self.requirements,
            Section::PreferredPoints => &mut self.preferred_points,
            Section::Benefits => &mut self.benefits,
            Section::WorkConditions => &mut self.work_conditions,
        }
    }
}

/// Splits a block of descriptive text into canonical sections
///
/// # Example
///
/// ```
/// use zighang_sync::extract::classify_sections;
///
/// let sections = classify_sections("담당업무\n백엔드 개발\n자격요건\n3년 이상");
/// assert_eq!(sections.main_tasks, "담당업무\n백엔드 개발");
/// assert_eq!(sections.requirements, "자격요건\n3년 이상");
/// assert!(sections.intro.is_empty());
/// ```
pub fn classify_sections(text: &str) -> DetailSections {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut buffers = SectionBuffers::default();
    let mut current = Section::Intro;

    for line in normalized.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            buffers.get_mut(current).push('\n');
            continue;
        }

        if let Some(section) = match_heading(trimmed) {
            current = section;
        }

        let buffer = buffers.get_mut(current);
        buffer.push_str(trimmed);
        buffer.push('\n');
    }

    DetailSections {
        intro: tidy(&buffers.intro),
        main_tasks: tidy(&buffers.main_tasks),
        requirements: tidy(&buffers.requirements),
        preferred_points: tidy(&buffers.preferred_points),
        benefits: tidy(&buffers.benefits),
        work_conditions: tidy(&buffers.work_conditions),
        raw_content: tidy(&normalized),
    }
}
