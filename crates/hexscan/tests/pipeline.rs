mod common;

use approx::assert_abs_diff_eq;
use hexscan::color::CountSource;
use hexscan::{
    detect, score_match, DetectionState, HistoryStore, MemoryHistory, Scanner, ScannerConfig,
    TransformSource,
};

use common::{
    five_magenta_three_yellow, five_magenta_three_yellow_pieces, img_from_raster, render_board,
    render_through, tilted_img_from_raster, BLUE, MAGENTA,
};

#[test]
fn five_magenta_three_yellow_magenta_wins() {
    let img = five_magenta_three_yellow();
    let mut scanner = Scanner::new(ScannerConfig::default()).unwrap();
    let result = detect::scan_image(&mut scanner, &img).unwrap();

    assert_eq!(result.transform_source, TransformSource::Fresh);
    assert_eq!(result.analysis.count_of("magenta"), 5);
    assert_eq!(result.analysis.count_of("yellow"), 3);
    assert_eq!(result.analysis.point_counts, vec![5, 3, 0, 0]);

    let scores: Vec<_> = result
        .outcome
        .scores
        .iter()
        .map(|p| (p.color.as_str(), p.score))
        .collect();
    assert_eq!(scores, [("magenta", 5), ("yellow", 3)]);
    let winner = result.outcome.winner().unwrap();
    assert_eq!(winner.color, "magenta");
    assert_eq!(result.record.winner_name.as_deref(), Some("Player 1"));
    assert_eq!(result.record.top_score, 5);
}

#[test]
fn recovered_corners_match_rendering() {
    let img = five_magenta_three_yellow();
    let mut scanner = Scanner::new(ScannerConfig::default()).unwrap();
    let result = detect::scan_image(&mut scanner, &img).unwrap();
    let truth = img_from_raster();
    let outline = result.transform.canonical.outline_px();
    for (corner, p) in result.transform.corners.iter().zip(outline.iter()) {
        let expected = truth.apply(*p);
        assert_abs_diff_eq!(corner.x, expected.x, epsilon = 8.0);
        assert_abs_diff_eq!(corner.y, expected.y, epsilon = 8.0);
    }
}

#[test]
fn tilted_board_counts_and_corners() {
    let truth = tilted_img_from_raster();
    let img = render_through(&truth, &five_magenta_three_yellow_pieces());
    let mut scanner = Scanner::new(ScannerConfig::default()).unwrap();
    let result = detect::scan_image(&mut scanner, &img).unwrap();

    assert_eq!(result.transform_source, TransformSource::Fresh);
    let outline = result.transform.canonical.outline_px();
    for (corner, p) in result.transform.corners.iter().zip(outline.iter()) {
        let expected = truth.apply(*p);
        assert_abs_diff_eq!(corner.x, expected.x, epsilon = 8.0);
        assert_abs_diff_eq!(corner.y, expected.y, epsilon = 8.0);
    }
    assert_eq!(result.analysis.count_of("magenta"), 5);
    assert_eq!(result.analysis.count_of("yellow"), 3);
    let winner = result.outcome.winner().unwrap();
    assert_eq!(winner.color, "magenta");
    assert_eq!(result.record.top_score, 5);
}

#[test]
fn empty_board_is_a_valid_no_winner_result() {
    let img = render_board(&[]);
    let mut scanner = Scanner::new(ScannerConfig::default()).unwrap();
    let result = detect::scan_image(&mut scanner, &img).unwrap();
    assert_eq!(result.analysis.total(), 0);
    assert_eq!(result.analysis.source, CountSource::Points);
    assert!(result.outcome.scores.iter().all(|p| p.score == 0));
    assert!(result.outcome.winner().is_none());
    assert_eq!(result.record.winner_name, None);
}

#[test]
fn colors_outside_the_roster_do_not_score() {
    let img = render_board(&[(2, BLUE), (12, BLUE), (20, MAGENTA)]);
    let mut scanner = Scanner::new(ScannerConfig::default()).unwrap();
    let result = detect::scan_image(&mut scanner, &img).unwrap();
    assert_eq!(result.analysis.count_of("blue"), 2);
    let outcome = score_match(scanner.roster(), |c| result.analysis.count_of(c));
    assert_eq!(outcome.winner().map(|p| p.color.as_str()), Some("magenta"));
    assert_eq!(outcome.top_score(), 1);
}

#[test]
fn ticks_lock_and_capture_falls_back_to_last_transform() {
    let board = five_magenta_three_yellow();
    let view = detect::rgb_view(&board).unwrap();
    let mut scanner = Scanner::new(ScannerConfig::default()).unwrap();
    for ts in 0..5 {
        scanner.tick(&view, ts * 160);
    }
    assert_eq!(scanner.state(), DetectionState::Locked);

    // Capture frame where the board is occluded: the last good transform is used.
    let blank = image::RgbImage::from_pixel(640, 480, image::Rgb([60, 55, 50]));
    let result = scanner.analyze(&detect::rgb_view(&blank).unwrap(), 900).unwrap();
    assert_eq!(result.transform_source, TransformSource::LastGood);
    assert_eq!(result.transform.timestamp_ms, 640);
    assert_eq!(result.analysis.total(), 0);

    let mut history = MemoryHistory::default();
    history.append(result.record).unwrap();
    assert_eq!(history.read_all().unwrap().len(), 1);
}

#[test]
fn failures_decay_from_locked_to_searching() {
    let board = five_magenta_three_yellow();
    let blank = image::RgbImage::from_pixel(640, 480, image::Rgb([60, 55, 50]));
    let mut scanner = Scanner::new(ScannerConfig::default()).unwrap();
    for ts in 0..5 {
        scanner.tick(&detect::rgb_view(&board).unwrap(), ts);
    }
    let mut states = Vec::new();
    for ts in 5..8 {
        states.push(scanner.tick(&detect::rgb_view(&blank).unwrap(), ts));
    }
    assert_eq!(
        states,
        [
            DetectionState::Aligning,
            DetectionState::Aligning,
            DetectionState::Searching
        ]
    );
}
