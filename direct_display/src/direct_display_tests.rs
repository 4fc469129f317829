//! Unit tests for direct_display.rs

use crate::backend::mock_backend::{MockBackend, MockFence};
use crate::config::{Config, ModeSelection};
use crate::direct_display::DirectDisplay;
use crate::error::Error;
use crate::frame_sync::SlotState;
use crate::types::{
    AlphaMode, AlphaModes, DisplayId, DisplayPlane, Extent2D, PhysicalDeviceInfo, PresentMode,
    QueueFamilyInfo,
};

fn init(backend: MockBackend) -> DirectDisplay<MockBackend> {
    DirectDisplay::init(backend, Config::default()).unwrap()
}

fn frame(display: &mut DirectDisplay<MockBackend>) {
    display.get_texture().unwrap();
    display.submit_texture().unwrap();
}

// ============================================================================
// INIT
// ============================================================================

#[test]
fn test_init_stage_order() {
    let display = init(MockBackend::new());
    let calls = &display.backend().calls;

    let order = [
        "available_instance_extensions",
        "create_instance",
        "enumerate_physical_devices",
        "select_physical_device",
        "displays",
        "acquire_display",
        "display_modes",
        "display_planes",
        "create_display_surface",
        "queue_families",
        "create_device",
        "create_command_pool",
        "create_swapchain",
        "create_interop_slot",
        "create_frame_sync",
        "record_blit_commands",
        "presignal_available",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|name| calls.iter().position(|c| c == name).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "calls: {:?}", calls);
}

#[test]
fn test_init_selects_expected_parameters() {
    let display = init(MockBackend::new());

    assert_eq!(display.display().name, "Mock Display");
    assert_eq!(display.mode().visible_region, Extent2D::new(1920, 1080));
    assert_eq!(display.width(), 1920);
    assert_eq!(display.height(), 1080);
    assert_eq!(display.plane_index(), 0);
    assert_eq!(display.alpha_mode(), AlphaMode::Opaque);
    assert_eq!(display.queue_family(), 0);
    assert_eq!(display.swapchain().image_count, 3);
    assert_eq!(display.swapchain().present_mode, PresentMode::Mailbox);

    let backend = display.backend();
    assert_eq!(backend.selected_device, Some(0));
    assert_eq!(backend.acquired_display, Some(DisplayId(0x10)));
    let surface = backend.surface.unwrap();
    assert_eq!(surface.image_extent, Extent2D::new(1920, 1080));
    assert_eq!(surface.global_alpha, 1.0);
}

#[test]
fn test_init_slot_count_invariant() {
    for count in 1..=4 {
        let display = init(MockBackend::new().with_image_count(count));
        let backend = display.backend();
        assert_eq!(display.slot_count(), count as usize);
        assert_eq!(backend.textures.len(), count as usize);
        assert_eq!(backend.available.len(), count as usize);
        assert_eq!(backend.finished.len(), count as usize);
        assert_eq!(backend.image_acquired.len(), count as usize);
        assert_eq!(backend.command_buffers, count as usize);
        assert_eq!(backend.call_count("create_interop_slot"), count as usize);
    }
}

#[test]
fn test_init_presignals_every_slot() {
    let display = init(MockBackend::new());
    assert!(display.backend().available.iter().all(|&signalled| signalled));
    assert!(display
        .backend()
        .fences
        .iter()
        .all(|&fence| fence == MockFence::Signaled));
}

#[test]
fn test_init_picks_first_qualifying_device() {
    let mut backend = MockBackend::new();
    let good = backend.devices[0].clone();
    backend.devices = vec![
        PhysicalDeviceInfo { name: "No display".to_string(), display_count: 0, ..good.clone() },
        good.clone(),
        PhysicalDeviceInfo { name: "Second".to_string(), ..good },
    ];
    let display = init(backend);
    assert_eq!(display.backend().selected_device, Some(1));
}

#[test]
fn test_init_basic_mode_scoring() {
    let config = Config {
        mode_selection: ModeSelection::Resolution,
        ..Config::default()
    };
    let display = DirectDisplay::init(MockBackend::new(), config).unwrap();
    assert_eq!(display.mode().visible_region, Extent2D::new(1920, 1080));
}

#[test]
fn test_init_frames_in_flight_cap() {
    let config = Config {
        max_frames_in_flight: Some(2),
        ..Config::default()
    };
    let display = DirectDisplay::init(MockBackend::new(), config).unwrap();
    assert_eq!(display.fence_count(), 2);
    assert_eq!(display.backend().fences.len(), 2);
}

// ============================================================================
// INIT FAILURES
// ============================================================================

#[test]
fn test_init_missing_instance_extension() {
    let mut backend = MockBackend::new();
    backend.instance_extensions.retain(|e| e != "VK_KHR_display");
    let result = DirectDisplay::init(backend, Config::default());
    assert_eq!(
        result.err(),
        Some(Error::MissingExtension("VK_KHR_display".to_string()))
    );
}

#[test]
fn test_init_no_suitable_device() {
    let mut backend = MockBackend::new();
    backend.devices[0].extensions.clear();
    let result = DirectDisplay::init(backend, Config::default());
    assert_eq!(result.err(), Some(Error::NoSuitableDevice));
}

#[test]
fn test_init_display_index_out_of_range() {
    let config = Config { display_index: 1, ..Config::default() };
    let result = DirectDisplay::init(MockBackend::new(), config);
    assert_eq!(result.err(), Some(Error::NoDisplay));
}

#[test]
fn test_init_no_compatible_plane() {
    let mut backend = MockBackend::new();
    backend.planes = vec![DisplayPlane {
        current_display: Some(DisplayId(0x99)),
        current_stack_index: 0,
    }];
    let result = DirectDisplay::init(backend, Config::default());
    assert_eq!(result.err(), Some(Error::NoCompatiblePlane));
}

#[test]
fn test_init_no_queue_family() {
    let mut backend = MockBackend::new();
    backend.queue_families = vec![QueueFamilyInfo {
        index: 0,
        supports_graphics: true,
        supports_present: false,
    }];
    let result = DirectDisplay::init(backend, Config::default());
    assert_eq!(result.err(), Some(Error::NoSuitableQueueFamily));
}

#[test]
fn test_init_alpha_fallback() {
    let mut backend = MockBackend::new();
    backend.alpha_modes = AlphaModes::PER_PIXEL;
    let display = init(backend);
    assert_eq!(display.alpha_mode(), AlphaMode::PerPixel);
}

#[test]
fn test_init_stage_failure_aborts_sequence() {
    for stage in [
        "create_instance",
        "acquire_display",
        "create_display_surface",
        "create_device",
        "create_command_pool",
        "create_swapchain",
        "create_interop_slot",
        "create_frame_sync",
        "record_blit_commands",
        "presignal_available",
    ] {
        let result = DirectDisplay::init(MockBackend::new().failing_at(stage), Config::default());
        match result {
            Err(e) => {
                assert!(e.is_fatal_init(), "stage {}", stage);
                assert_eq!(
                    e,
                    Error::InitializationFailed(format!("Backend error: mock failure in {}", stage))
                );
            }
            Ok(_) => panic!("stage {} failure must abort init", stage),
        }
    }
}

#[test]
fn test_init_keeps_specific_fatal_errors() {
    let mut backend = MockBackend::new();
    backend.devices.clear();
    let result = DirectDisplay::init(backend, Config::default());
    assert!(matches!(result, Err(Error::NoSuitableDevice)));
}

// ============================================================================
// FRAME PROTOCOL
// ============================================================================

#[test]
fn test_three_images_visit_slots_in_order() {
    let mut display = init(MockBackend::new().with_image_count(3));
    let mut visited = Vec::new();
    for _ in 0..4 {
        visited.push(display.current_slot());
        let texture = display.get_texture().unwrap();
        assert_eq!(texture, display.backend().textures[display.current_slot()]);
        display.submit_texture().unwrap();
    }
    assert_eq!(visited, vec![0, 1, 2, 0]);
    assert_eq!(display.backend().presented, vec![0, 1, 2, 0]);
}

#[test]
fn test_cursor_advances_by_one_mod_slot_count() {
    for count in 1..=4 {
        let mut display = init(MockBackend::new().with_image_count(count));
        for _ in 0..(count * 2 + 1) {
            let before = display.current_slot();
            frame(&mut display);
            assert_eq!(display.current_slot(), (before + 1) % count as usize);
        }
    }
}

#[test]
fn test_round_trip_restores_cursor_and_states() {
    let mut display = init(MockBackend::new().with_image_count(3));
    let start = display.current_slot();
    for _ in 0..display.slot_count() {
        frame(&mut display);
    }
    assert_eq!(display.current_slot(), start);
    assert_eq!(display.frame_count(), 3);
    for slot in 0..display.slot_count() {
        assert_eq!(display.slot_state(slot), Some(SlotState::Available));
    }
}

#[test]
fn test_frames_in_flight_bounded_by_slot_count() {
    let mut display = init(MockBackend::new().with_image_count(3));
    for _ in 0..20 {
        frame(&mut display);
        assert!(display.backend().in_flight <= display.slot_count());
    }
    assert_eq!(display.backend().max_in_flight, 3);
}

#[test]
fn test_frames_in_flight_bounded_by_cap() {
    let config = Config { max_frames_in_flight: Some(1), ..Config::default() };
    let mut display = DirectDisplay::init(MockBackend::new(), config).unwrap();
    for _ in 0..10 {
        frame(&mut display);
    }
    assert_eq!(display.backend().max_in_flight, 1);
}

#[test]
fn test_get_texture_moves_slot_to_rendering() {
    let mut display = init(MockBackend::new());
    display.get_texture().unwrap();
    assert_eq!(display.slot_state(0), Some(SlotState::Rendering));
    assert_eq!(display.slot_state(1), Some(SlotState::Available));
}

#[test]
fn test_submit_order_within_frame() {
    let mut display = init(MockBackend::new());
    let before = display.backend().calls.len();
    frame(&mut display);
    let frame_calls: Vec<&str> =
        display.backend().calls[before..].iter().map(|c| c.as_str()).collect();
    assert_eq!(
        frame_calls,
        vec![
            "wait_available",
            "wait_frame_fence",
            "signal_finished",
            "acquire_next_image",
            "reset_frame_fence",
            "submit_blit",
            "present",
            "signal_available",
        ]
    );
}

#[test]
fn test_get_texture_twice_is_invalid_state() {
    let mut display = init(MockBackend::new());
    display.get_texture().unwrap();
    let waits = display.backend().call_count("wait_available");

    assert!(matches!(display.get_texture(), Err(Error::InvalidState(_))));
    assert_eq!(display.backend().call_count("wait_available"), waits);
}

#[test]
fn test_submit_without_get_is_invalid_state() {
    let mut display = init(MockBackend::new());
    assert!(matches!(display.submit_texture(), Err(Error::InvalidState(_))));
    assert_eq!(display.backend().call_count("wait_frame_fence"), 0);
    assert_eq!(display.current_slot(), 0);
}

#[test]
fn test_acquired_index_mismatch_is_error() {
    let mut backend = MockBackend::new();
    backend.acquire_override = Some(2);
    let mut display = init(backend);

    display.get_texture().unwrap();
    assert_eq!(
        display.submit_texture(),
        Err(Error::ImageIndexMismatch { expected: 0, acquired: 2 })
    );
    assert_eq!(display.backend().call_count("submit_blit"), 0);
    assert_eq!(display.frame_count(), 0);
}

#[test]
fn test_failed_signal_finished_can_be_retried() {
    let mut display = init(MockBackend::new().failing_at("signal_finished"));
    display.get_texture().unwrap();
    assert!(matches!(display.submit_texture(), Err(Error::BackendError(_))));
    assert_eq!(display.slot_state(0), Some(SlotState::Rendering));
    assert_eq!(display.backend().fences[0], MockFence::Signaled);

    display.backend_mut().fail_at = None;
    display.submit_texture().unwrap();
    assert_eq!(display.current_slot(), 1);
    assert_eq!(display.frame_count(), 1);
    assert_eq!(display.slot_state(0), Some(SlotState::Available));
}

#[test]
fn test_failed_acquire_leaves_fence_signalled() {
    let mut display = init(MockBackend::new().failing_at("acquire_next_image"));
    display.get_texture().unwrap();
    assert!(display.submit_texture().is_err());
    assert_eq!(display.backend().call_count("reset_frame_fence"), 0);
    assert_eq!(display.backend().fences[0], MockFence::Signaled);
}

#[test]
fn test_backend_frame_error_is_reported() {
    let mut display = init(MockBackend::new().failing_at("present"));
    display.get_texture().unwrap();
    assert!(matches!(display.submit_texture(), Err(Error::BackendError(_))));
    assert_eq!(display.current_slot(), 0);
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[test]
fn test_shutdown_waits_idle_once() {
    let mut display = init(MockBackend::new());
    frame(&mut display);
    display.shutdown().unwrap();
    display.shutdown().unwrap();
    assert_eq!(display.backend().idle_waits, 1);
    assert_eq!(display.backend().in_flight, 0);
}

#[test]
fn test_frame_calls_after_shutdown_fail() {
    let mut display = init(MockBackend::new());
    display.shutdown().unwrap();
    assert!(matches!(display.get_texture(), Err(Error::InvalidState(_))));
    assert!(matches!(display.submit_texture(), Err(Error::InvalidState(_))));
}
