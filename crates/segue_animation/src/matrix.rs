//! Orchestration matrix
//!
//! Flattens a timeline into rows of frame fragments indexed by 60 Hz column.
//! Each row belongs to one target; a fragment is the frame run of one
//! property (or wait) starting at some column. Sequences place children
//! back-to-back, parallel timelines stack them at column zero.
//!
//! [`OrchestrationMatrix::get_keyframes`] walks each row column by column:
//!
//! - filling fragments back-fill their first frame into every earlier column
//!   and forward-fill their last frame into every later column
//! - non-filling fragments only contribute during their own columns
//! - wait placeholders occupy columns without contributing properties

use std::hash::Hash;

use indexmap::IndexMap;
use tracing::trace;

use segue_core::{frames_to_time, Keyframe, Result, SegueError};

use crate::behavior::Behavior;
use crate::frame::{MatrixFrame, PropertyFrame};
use crate::generate::{generate_frames, FrameTiming, MotionTarget};
use crate::timeline::{
    Anchor, AnimationTimeline, MotionDefinition, MotionOptions, PropertyMotion, TimelineItem,
    TimelineKind, TimingDuration,
};

/// A run of frames in one row
#[derive(Clone, Debug, PartialEq)]
pub struct RowFragment {
    pub frames: Vec<MatrixFrame>,
    pub start_column: usize,
    pub fill: bool,
}

impl RowFragment {
    pub fn end_column(&self) -> usize {
        self.start_column + self.frames.len()
    }
}

/// Column-indexed frames for every target of a timeline
#[derive(Clone, Debug)]
pub struct OrchestrationMatrix<K> {
    rows: IndexMap<K, Vec<RowFragment>>,
    total_columns: usize,
}

impl<K> Default for OrchestrationMatrix<K> {
    fn default() -> Self {
        Self {
            rows: IndexMap::new(),
            total_columns: 0,
        }
    }
}

impl<K> OrchestrationMatrix<K>
where
    K: MotionTarget + Clone + Eq + Hash,
{
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn total_columns(&self) -> usize {
        self.total_columns
    }

    pub fn rows(&self) -> &IndexMap<K, Vec<RowFragment>> {
        &self.rows
    }

    /// Merge `other` into this matrix with its columns shifted by `column`
    pub fn add(&mut self, column: usize, other: OrchestrationMatrix<K>) {
        for (target, fragments) in other.rows {
            self.rows
                .entry(target)
                .or_default()
                .extend(fragments.into_iter().map(|mut fragment| {
                    fragment.start_column += column;
                    fragment
                }));
        }
        self.total_columns = self.total_columns.max(other.total_columns + column);
    }

    /// Build the matrix of any timeline item
    pub fn from_item(item: &TimelineItem<K>) -> Result<Self> {
        Self::from_item_within(item, None)
    }

    fn from_item_within(item: &TimelineItem<K>, max_length: Option<usize>) -> Result<Self> {
        match item {
            TimelineItem::Motion(motion) => Self::from_motion_within(motion, max_length),
            TimelineItem::Timeline(timeline) => Self::from_timeline(timeline),
        }
    }

    pub fn from_timeline(timeline: &AnimationTimeline<K>) -> Result<Self> {
        match timeline.kind {
            TimelineKind::Sequence => Self::from_sequential_timeline(timeline),
            TimelineKind::Parallel => Self::from_parallel_timeline(timeline),
        }
    }

    /// Children one after another
    pub fn from_sequential_timeline(timeline: &AnimationTimeline<K>) -> Result<Self> {
        let mut matrix = Self::empty();
        for item in &timeline.animations {
            let submatrix = Self::from_item(item)?;
            matrix.add(matrix.total_columns, submatrix);
        }
        Ok(matrix)
    }

    /// Children side by side, starting at column zero
    ///
    /// Motions with an inferred duration or a non-start anchor are laid out
    /// against the longest sibling that precedes them.
    pub fn from_parallel_timeline(timeline: &AnimationTimeline<K>) -> Result<Self> {
        let mut max_length = 0;
        let mut submatrices = Vec::with_capacity(timeline.animations.len());
        for item in &timeline.animations {
            let submatrix = Self::from_item_within(item, Some(max_length))?;
            max_length = max_length.max(submatrix.total_columns);
            submatrices.push(submatrix);
        }

        let mut matrix = Self::empty();
        for submatrix in submatrices {
            matrix.add(0, submatrix);
        }
        Ok(matrix)
    }

    /// One fragment per target and animated property
    pub fn from_motion_definition(motion: &MotionDefinition<K>) -> Result<Self> {
        Self::from_motion_within(motion, None)
    }

    fn from_motion_within(motion: &MotionDefinition<K>, max_length: Option<usize>) -> Result<Self> {
        let timing = &motion.timing;
        let duration_ms = match timing.duration {
            Some(TimingDuration::Ms(ms)) => Some(ms),
            Some(TimingDuration::Infer) => match max_length {
                Some(max) if max > 0 => Some(frames_to_time(max - 1)),
                _ => {
                    return Err(SegueError::InvalidTimeline(
                        "cannot infer a duration without a preceding parallel sibling".to_string(),
                    ))
                }
            },
            None => None,
        };
        let anchor_within = match (timing.anchor, max_length) {
            (Anchor::Start, _) => None,
            (anchor, Some(max)) if max > 0 => Some((anchor, max)),
            (anchor, _) => {
                return Err(SegueError::InvalidTimeline(format!(
                    "cannot anchor to {anchor:?} without a preceding parallel sibling"
                )))
            }
        };

        let frame_timing = FrameTiming {
            behavior: &timing.behavior,
            duration_ms,
            delay_ms: timing.delay_ms,
        };
        let fill = timing.behavior.fill();

        let mut matrix = Self::empty();
        for target in &motion.targets {
            let mut fragments = Vec::new();
            if matches!(timing.behavior, Behavior::Wait(_)) {
                let wait = PropertyMotion::Animate(MotionOptions::default());
                let frames = generate_frames(target, "wait", &wait, frame_timing)?;
                push_fragment(&mut fragments, frames, fill);
            } else {
                for (property, property_motion) in &motion.properties {
                    let frames = generate_frames(target, property, property_motion, frame_timing)?;
                    push_fragment(&mut fragments, frames, fill);
                }
            }

            if let Some((anchor, max)) = anchor_within {
                for fragment in &mut fragments {
                    let slack = max.saturating_sub(fragment.frames.len());
                    fragment.start_column = match anchor {
                        Anchor::Start => 0,
                        Anchor::Center => (slack as f64 / 2.0).round() as usize,
                        Anchor::End => slack,
                    };
                }
            }

            for fragment in &fragments {
                matrix.total_columns = matrix.total_columns.max(fragment.end_column());
            }
            matrix.rows.entry(target.clone()).or_default().extend(fragments);
        }
        Ok(matrix)
    }

    /// Keyframes for every row, one per column
    ///
    /// `construct` folds one column's frames into the previous keyframe;
    /// [`construct_keyframe`](crate::keyframe::construct_keyframe) is the
    /// usual choice.
    pub fn get_keyframes<F>(&self, construct: F) -> IndexMap<K, Vec<Keyframe>>
    where
        F: Fn(&Keyframe, &[PropertyFrame]) -> Keyframe,
    {
        let mut result = IndexMap::with_capacity(self.rows.len());
        for (target, fragments) in &self.rows {
            result.insert(target.clone(), self.row_keyframes(fragments, &construct));
        }
        result
    }

    fn row_keyframes<F>(&self, fragments: &[RowFragment], construct: &F) -> Vec<Keyframe>
    where
        F: Fn(&Keyframe, &[PropertyFrame]) -> Keyframe,
    {
        let base_frames: Vec<PropertyFrame> = fragments
            .iter()
            .filter(|fragment| fragment.fill)
            .filter_map(|fragment| fragment.frames.first().cloned().flatten())
            .collect();
        let mut previous = construct(&Keyframe::new(), &base_frames);

        // (fragment, next frame index)
        let mut active: Vec<(&RowFragment, usize)> = Vec::new();
        let mut pending_removal: Vec<String> = Vec::new();
        let mut keyframes = Vec::with_capacity(self.total_columns);

        for column in 0..self.total_columns {
            active.extend(
                fragments
                    .iter()
                    .filter(|fragment| fragment.start_column == column)
                    .map(|fragment| (fragment, 0)),
            );

            for property in pending_removal.drain(..) {
                previous.shift_remove(&property);
            }

            let mut frames = Vec::new();
            for (fragment, cursor) in &mut active {
                let Some(slot) = fragment.frames.get(*cursor) else {
                    continue;
                };
                *cursor += 1;
                if let Some(frame) = slot {
                    if !fragment.fill && *cursor == fragment.frames.len() {
                        pending_removal.push(frame.property.clone());
                    }
                    frames.push(frame.clone());
                }
            }
            active.retain(|(fragment, cursor)| *cursor < fragment.frames.len());

            trace!(column, frames = frames.len(), "matrix column");
            let keyframe = construct(&previous, &frames);
            keyframes.push(keyframe.clone());
            previous = keyframe;
        }
        keyframes
    }
}

fn push_fragment(fragments: &mut Vec<RowFragment>, frames: Vec<MatrixFrame>, fill: bool) {
    if !frames.is_empty() {
        fragments.push(RowFragment {
            frames,
            start_column: 0,
            fill,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::StaticBehavior;
    use crate::keyframe::construct_keyframe;
    use crate::timeline::MotionTiming;
    use segue_core::{Value, FRAME_DURATION_MS};

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    struct TestSprite(&'static str);

    impl MotionTarget for TestSprite {
        fn initial_value(&self, _property: &str) -> Option<Value> {
            None
        }

        fn final_value(&self, _property: &str) -> Option<Value> {
            None
        }
    }

    fn frames(n: usize) -> f64 {
        n as f64 * FRAME_DURATION_MS
    }

    fn wait(n: usize) -> TimelineItem<TestSprite> {
        MotionDefinition::wait(vec![TestSprite("sprite")], frames(n)).into()
    }

    fn motion(
        properties: Vec<(&'static str, PropertyMotion)>,
        timing: MotionTiming,
    ) -> MotionDefinition<TestSprite> {
        MotionDefinition::new(vec![TestSprite("sprite")], properties, timing)
    }

    fn transient_hold(property: &'static str, value: f64, n: usize) -> TimelineItem<TestSprite> {
        motion(
            vec![(property, Value::Number(value).into())],
            MotionTiming::new(Behavior::Static(StaticBehavior::transient())).with_duration(frames(n)),
        )
        .into()
    }

    /// Render each keyframe as `property: value` pairs
    fn table(timeline: AnimationTimeline<TestSprite>) -> Vec<Vec<String>> {
        let matrix = OrchestrationMatrix::from_timeline(&timeline).unwrap();
        let keyframes = matrix.get_keyframes(construct_keyframe);
        keyframes[&TestSprite("sprite")]
            .iter()
            .map(|keyframe| {
                keyframe
                    .iter()
                    .map(|(property, value)| format!("{property}: {value}"))
                    .collect()
            })
            .collect()
    }

    fn rows(entries: &[&[&str]]) -> Vec<Vec<String>> {
        entries
            .iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_wait_generates_empty_keyframes() {
        let table = table(AnimationTimeline::sequence(vec![wait(3)]));
        assert_eq!(table, vec![Vec::<String>::new(); 4]);
    }

    #[test]
    fn test_sequence_backfills() {
        let tween = motion(
            vec![("width", MotionOptions::between(Value::px(10.0), Value::px(20.0)).into())],
            MotionTiming::new(Behavior::linear()).with_duration(frames(3)),
        );
        let table = table(AnimationTimeline::sequence(vec![wait(3), tween.into()]));

        assert_eq!(
            table,
            rows(&[
                &["width: 10px"],
                &["width: 10px"],
                &["width: 10px"],
                &["width: 10px"],
                &["width: 10px"],
                &["width: 13.333333333333332px"],
                &["width: 16.666666666666664px"],
                &["width: 20px"],
            ])
        );
    }

    #[test]
    fn test_sequence_forward_fills() {
        let tween = motion(
            vec![("width", MotionOptions::between(Value::px(10.0), Value::px(20.0)).into())],
            MotionTiming::new(Behavior::linear()).with_duration(frames(3)),
        );
        let table = table(AnimationTimeline::sequence(vec![tween.into(), wait(3)]));

        assert_eq!(
            table,
            rows(&[
                &["width: 10px"],
                &["width: 13.333333333333332px"],
                &["width: 16.666666666666664px"],
                &["width: 20px"],
                &["width: 20px"],
                &["width: 20px"],
                &["width: 20px"],
                &["width: 20px"],
            ])
        );
    }

    #[test]
    fn test_transient_static_is_not_filled() {
        let table = table(AnimationTimeline::sequence(vec![
            wait(3),
            transient_hold("zIndex", 123.0, 3),
            wait(3),
        ]));

        let mut expected = vec![Vec::new(); 4];
        expected.extend(vec![vec!["zIndex: 123".to_string()]; 4]);
        expected.extend(vec![Vec::new(); 4]);
        assert_eq!(table, expected);
    }

    #[test]
    fn test_nested_timelines() {
        let fade = motion(
            vec![("opacity", MotionOptions::between(0.0, 1.0).into())],
            MotionTiming::new(Behavior::linear()).with_duration(frames(3)),
        );
        let table = table(AnimationTimeline::sequence(vec![
            wait(3),
            AnimationTimeline::parallel(vec![fade.into(), transient_hold("zIndex", 4.0, 1)]).into(),
            transient_hold("zIndex", 3.0, 3),
        ]));

        assert_eq!(
            table,
            rows(&[
                &["opacity: 0"],
                &["opacity: 0"],
                &["opacity: 0"],
                &["opacity: 0"],
                &["opacity: 0", "zIndex: 4"],
                &["opacity: 0.3333333333333333", "zIndex: 4"],
                &["opacity: 0.6666666666666666"],
                &["opacity: 1"],
                &["opacity: 1", "zIndex: 3"],
                &["opacity: 1", "zIndex: 3"],
                &["opacity: 1", "zIndex: 3"],
                &["opacity: 1", "zIndex: 3"],
            ])
        );
    }

    #[test]
    fn test_add_offsets_columns() {
        let mut matrix = OrchestrationMatrix::from_item(&wait(3)).unwrap();
        assert_eq!(matrix.total_columns(), 4);

        matrix.add(2, OrchestrationMatrix::from_item(&wait(3)).unwrap());
        assert_eq!(matrix.total_columns(), 6);
        let starts: Vec<usize> = matrix.rows()[&TestSprite("sprite")]
            .iter()
            .map(|fragment| fragment.start_column)
            .collect();
        assert_eq!(starts, vec![0, 2]);
    }

    #[test]
    fn test_rows_exist_for_targets_without_frames() {
        let still = motion(
            vec![("opacity", MotionOptions::between(1.0, 1.0).into())],
            MotionTiming::new(Behavior::linear()).with_duration(frames(3)),
        );
        let matrix = OrchestrationMatrix::from_motion_definition(&still).unwrap();
        assert_eq!(matrix.total_columns(), 0);
        assert!(matrix.rows()[&TestSprite("sprite")].is_empty());
        assert!(matrix.get_keyframes(construct_keyframe)[&TestSprite("sprite")].is_empty());
    }

    #[test]
    fn test_inferred_duration_matches_longest_sibling() {
        let slide = motion(
            vec![("x", MotionOptions::between(Value::px(0.0), Value::px(60.0)).into())],
            MotionTiming::new(Behavior::linear()).with_duration(frames(6)),
        );
        let fade = motion(
            vec![("opacity", MotionOptions::between(0.0, 1.0).into())],
            MotionTiming::new(Behavior::linear()).with_inferred_duration(),
        );
        let matrix = OrchestrationMatrix::from_timeline(&AnimationTimeline::parallel(vec![
            slide.into(),
            fade.into(),
        ]))
        .unwrap();

        let lengths: Vec<usize> = matrix.rows()[&TestSprite("sprite")]
            .iter()
            .map(|fragment| fragment.frames.len())
            .collect();
        assert_eq!(lengths, vec![7, 7]);
    }

    #[test]
    fn test_anchor_end_and_center() {
        let slide = motion(
            vec![("x", MotionOptions::between(Value::px(0.0), Value::px(60.0)).into())],
            MotionTiming::new(Behavior::linear()).with_duration(frames(8)),
        );
        let end = motion(
            vec![("opacity", MotionOptions::between(0.0, 1.0).into())],
            MotionTiming::new(Behavior::linear())
                .with_duration(frames(2))
                .with_anchor(Anchor::End),
        );
        let center = motion(
            vec![("scale", MotionOptions::between(1.0, 2.0).into())],
            MotionTiming::new(Behavior::linear())
                .with_duration(frames(2))
                .with_anchor(Anchor::Center),
        );
        let matrix = OrchestrationMatrix::from_timeline(&AnimationTimeline::parallel(vec![
            slide.into(),
            end.into(),
            center.into(),
        ]))
        .unwrap();

        let starts: Vec<usize> = matrix.rows()[&TestSprite("sprite")]
            .iter()
            .map(|fragment| fragment.start_column)
            .collect();
        assert_eq!(starts, vec![0, 6, 3]);
        assert_eq!(matrix.total_columns(), 9);
    }

    #[test]
    fn test_infer_and_anchor_need_a_sibling() {
        let inferred = motion(
            vec![("opacity", MotionOptions::between(0.0, 1.0).into())],
            MotionTiming::new(Behavior::linear()).with_inferred_duration(),
        );
        assert!(matches!(
            OrchestrationMatrix::from_motion_definition(&inferred),
            Err(SegueError::InvalidTimeline(_))
        ));

        let anchored = motion(
            vec![("opacity", MotionOptions::between(0.0, 1.0).into())],
            MotionTiming::new(Behavior::linear())
                .with_duration(frames(2))
                .with_anchor(Anchor::End),
        );
        let first_in_parallel = AnimationTimeline::parallel(vec![anchored.into()]);
        assert!(OrchestrationMatrix::from_timeline(&first_in_parallel).is_err());
    }

    #[test]
    fn test_filling_static_persists() {
        let hold = motion(
            vec![("zIndex", Value::Number(5.0).into())],
            MotionTiming::new(Behavior::hold()).with_duration(frames(1)),
        );
        let table = table(AnimationTimeline::sequence(vec![hold.into(), wait(1)]));
        assert_eq!(table, vec![vec!["zIndex: 5".to_string()]; 4]);
    }
}
